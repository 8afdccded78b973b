//! Unwarp - rectify a four-anchor quadrilateral of a picture
//!
//! Anchors are given on the command line or stored in the configuration
//! file. `apply` writes the rectified picture, `inspect` prints the solved
//! transform as JSON and `mark` draws the anchors to check their placement.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use unwarp::config::Config;
use unwarp::image_io::{
    default_output_path, from_rgba_image, load_buffer, save_buffer, to_rgba_image,
};
use unwarp::preview::draw_anchors;
use unwarp::{target_size, AnchorSet, AspectRatio, PerspectiveTransform, Pixel, TransformError};

/// Unwarp - perspective rectification from four anchors
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "unwarp.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rectify a picture
    Apply(ApplyArgs),
    /// Print the corner assignment and matrix as JSON
    Inspect(InspectArgs),
    /// Draw the anchors over a picture
    Mark(MarkArgs),
}

#[derive(Args, Debug, Clone)]
struct AnchorArgs {
    /// Anchor as `x,y`, four are needed (defaults to the configured anchors)
    #[arg(short, long = "anchor", value_name = "X,Y")]
    anchors: Vec<Pixel>,

    /// Store the given anchors in the configuration file
    #[arg(long)]
    remember: bool,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Picture to rectify
    image: PathBuf,

    #[command(flatten)]
    anchors: AnchorArgs,

    /// Width:height ratio of the result (defaults to the configured ratio)
    #[arg(short, long)]
    ratio: Option<AspectRatio>,

    /// Exact size of the result, overrides the ratio
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    size: Option<(usize, usize)>,

    /// Output path (defaults to the input path with the configured suffix)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    #[command(flatten)]
    anchors: AnchorArgs,

    /// Size of the target rectangle
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    size: (usize, usize),
}

#[derive(Args, Debug)]
struct MarkArgs {
    /// Picture to draw on
    image: PathBuf,

    #[command(flatten)]
    anchors: AnchorArgs,

    /// Output path (defaults to the input path with an `-anchors` suffix)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let mut config = Config::load_or_create(&cli.config)?;

    match cli.cmd {
        Command::Apply(args) => {
            let anchors = collect_anchors(&args.anchors, &mut config, &cli.config)?;
            run_apply(&args, &anchors, &config)
        }
        Command::Inspect(args) => {
            let anchors = collect_anchors(&args.anchors, &mut config, &cli.config)?;
            run_inspect(&args, &anchors)
        }
        Command::Mark(args) => {
            let anchors = collect_anchors(&args.anchors, &mut config, &cli.config)?;
            run_mark(&args, &anchors, &config)
        }
    }
}

fn run_apply(args: &ApplyArgs, anchors: &AnchorSet, config: &Config) -> Result<()> {
    let (width, height) = match args.size {
        Some(size) => size,
        None => {
            let ratio = match args.ratio {
                Some(ratio) => ratio,
                None => config.aspect_ratio()?,
            };
            target_size(anchors, ratio).map_err(user_error)?
        }
    };

    let source = load_buffer(&args.image)?;
    info!(
        "Rectifying {:?} ({}x{}) into {}x{}",
        args.image,
        source.width(),
        source.height(),
        width,
        height
    );

    let result = unwarp::transform(&source, anchors, width, height).map_err(user_error)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.image, &config.output.suffix));
    save_buffer(&result, &output)?;
    info!("Wrote {:?}", output);
    Ok(())
}

fn run_inspect(args: &InspectArgs, anchors: &AnchorSet) -> Result<()> {
    let (width, height) = args.size;
    let transform = PerspectiveTransform::solve(anchors, width, height).map_err(user_error)?;
    let json = serde_json::to_string_pretty(&transform.report())
        .context("Failed to serialize transform report")?;
    println!("{}", json);
    Ok(())
}

fn run_mark(args: &MarkArgs, anchors: &AnchorSet, config: &Config) -> Result<()> {
    let source = load_buffer(&args.image)?;
    let mut image = to_rgba_image(&source)?;
    draw_anchors(&mut image, anchors, &config.marker);

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.image, "-anchors"));
    save_buffer(&from_rgba_image(&image)?, &output)?;
    info!("Marked {} anchors in {:?}", anchors.len(), output);
    Ok(())
}

/// Anchors from the command line, or from the configuration when none given
fn collect_anchors(args: &AnchorArgs, config: &mut Config, path: &Path) -> Result<AnchorSet> {
    if args.anchors.is_empty() {
        if args.remember {
            warn!("--remember without --anchor, nothing to store");
        }
        return config.anchor_set();
    }

    let anchors = AnchorSet::from_pixels(&args.anchors).map_err(user_error)?;
    if anchors.len() < args.anchors.len() {
        warn!("Ignored {} repeated anchors", args.anchors.len() - anchors.len());
    }
    if args.remember {
        config.set_anchors(&anchors);
        config.save(path)?;
        info!("Stored {} anchors in {:?}", anchors.len(), path);
    }
    Ok(anchors)
}

/// Short message for failures the user fixes by moving anchors
fn user_error(err: TransformError) -> anyhow::Error {
    let message = match err {
        TransformError::AnchorCount(_) => Some("4 anchors required."),
        _ if err.is_geometric() => Some("Anchors configuration is not usable."),
        _ => None,
    };
    match message {
        Some(message) => anyhow::Error::new(err).context(message),
        None => anyhow::Error::new(err),
    }
}

/// Parse `WxH` into a non-empty size
fn parse_size(s: &str) -> std::result::Result<(usize, usize), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected `WxH`, got `{}`", s))?;
    let width: usize = w
        .trim()
        .parse()
        .map_err(|e| format!("invalid width `{}`: {}", w, e))?;
    let height: usize = h
        .trim()
        .parse()
        .map_err(|e| format!("invalid height `{}`: {}", h, e))?;
    if width == 0 || height == 0 {
        return Err(format!("size must not be empty, got `{}`", s));
    }
    Ok((width, height))
}
