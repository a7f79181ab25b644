//! Application configuration.

use crate::error::{RenderError, RenderResult};
use crate::ffmpeg::ToolPaths;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration, usually loaded from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub render: RenderConfig,
    pub tools: ToolPaths,
    pub logging: LoggingConfig,
}

/// Fixed encoder policy. Not exposed per request, only per installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output canvas width in pixels.
    pub width: u32,
    /// Output canvas height in pixels.
    pub height: u32,
    pub fps: u32,
    /// x264 constant rate factor.
    pub crf: u32,
    /// x264 preset name.
    pub preset: String,
    /// AAC bitrate as passed to `-b:a`, e.g. "192k".
    pub audio_bitrate: String,
    /// Distance in pixels between overlay text and the top/bottom edge.
    pub text_margin: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            crf: 20,
            preset: "medium".to_string(),
            audio_bitrate: "192k".to_string(),
            text_margin: 50,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "stillframe=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Read a config file. Keys missing from the file keep their defaults.
    pub fn load(path: &Path) -> RenderResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.render.validate()?;
        Ok(config)
    }
}

impl RenderConfig {
    pub fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::config(format!(
                "canvas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(RenderError::config("fps must be positive"));
        }
        if self.preset.trim().is_empty() || self.audio_bitrate.trim().is_empty() {
            return Err(RenderError::config("preset and audio_bitrate must be set"));
        }
        Ok(())
    }
}
