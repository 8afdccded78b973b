//! Configuration management for Unwarp

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::anchors::{AnchorSet, Coord, Pixel};
use crate::buffer::Color;
use crate::sizing::AspectRatio;

/// Default ratio of the rectified picture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatioConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for RatioConfig {
    fn default() -> Self {
        let ratio = AspectRatio::default();
        Self {
            width: ratio.width,
            height: ratio.height,
        }
    }
}

/// Where results are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Inserted before the extension of the input path
    pub suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: "-new".to_string(),
        }
    }
}

/// Look of the anchor markers drawn by `mark`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Side of the outer square in pixels
    pub size: u32,
    /// RGBA
    pub outer: [u8; 4],
    pub inner: [u8; 4],
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            size: 10,
            outer: [255, 0, 0, 255],
            inner: [0, 0, 0, 255],
        }
    }
}

impl MarkerConfig {
    pub fn outer_color(&self) -> Color {
        Color::from_rgba(self.outer)
    }

    pub fn inner_color(&self) -> Color {
        Color::from_rgba(self.inner)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ratio: RatioConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub marker: MarkerConfig,

    /// Anchors used when none are given on the command line, as `[x, y]`
    #[serde(default)]
    pub anchors: Vec<[Coord; 2]>,
}

impl Config {
    /// Load configuration from file or create default
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::debug!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Configured ratio, checked
    pub fn aspect_ratio(&self) -> Result<AspectRatio> {
        AspectRatio::new(self.ratio.width, self.ratio.height)
            .map_err(anyhow::Error::msg)
            .context("Invalid [ratio] section")
    }

    /// Configured anchors as a set
    pub fn anchor_set(&self) -> Result<AnchorSet> {
        let pixels: Vec<Pixel> = self.anchors.iter().map(|&p| Pixel::from(p)).collect();
        AnchorSet::from_pixels(&pixels).context("Invalid anchors in configuration")
    }

    /// Replace the stored anchors
    pub fn set_anchors(&mut self, anchors: &AnchorSet) {
        self.anchors = anchors.iter().map(|p| [p.x, p.y]).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("unwarp-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output.suffix, "-new");
        assert_eq!(config.marker.size, 10);
        assert_eq!(config.aspect_ratio().unwrap(), AspectRatio::default());
        assert!(config.anchor_set().unwrap().is_empty());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            anchors = [[0, 0], [10, 0], [10, 5], [0, 5]]

            [ratio]
            width = 16.0
            height = 9.0
            "#,
        )
        .unwrap();
        assert_eq!(config.output.suffix, "-new");
        assert_eq!(config.aspect_ratio().unwrap().value(), 16.0 / 9.0);
        let anchors = config.anchor_set().unwrap();
        assert!(anchors.is_full());
        assert!(anchors.contains(Pixel::new(10, 5)));
    }

    #[test]
    fn test_invalid_sections() {
        let mut config = Config::default();
        config.ratio.height = 0.0;
        assert!(config.aspect_ratio().is_err());

        config.anchors = vec![[0, 0], [1, 0], [2, 0], [3, 0], [4, 0]];
        assert!(config.anchor_set().is_err());
    }

    #[test]
    fn test_load_or_create_roundtrip() {
        let path = temp_path("config.toml");
        let _ = std::fs::remove_file(&path);

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.output.suffix, "-new");

        let mut edited = created.clone();
        edited.output.suffix = "-flat".to_string();
        let anchors = AnchorSet::from_pixels(&[Pixel::new(3, 4), Pixel::new(-1, 2)]).unwrap();
        edited.set_anchors(&anchors);
        edited.save(&path).unwrap();

        let loaded = Config::load_or_create(&path).unwrap();
        assert_eq!(loaded.output.suffix, "-flat");
        assert_eq!(loaded.anchors, vec![[3, 4], [-1, 2]]);

        std::fs::remove_file(&path).unwrap();
    }
}
