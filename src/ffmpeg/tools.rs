use crate::error::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};

/// Locations of the external executables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl ToolPaths {
    pub fn new() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }

    pub fn with_paths(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Check that both tools can be executed. Reports the first one missing.
    pub fn ensure_available(&self) -> RenderResult<()> {
        for tool in [&self.ffmpeg, &self.ffprobe] {
            if !is_available(tool) {
                return Err(RenderError::ToolMissing { tool: tool.clone() });
            }
        }
        tracing::debug!(ffmpeg = %self.ffmpeg, ffprobe = %self.ffprobe, "encoder tools available");
        Ok(())
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if a program answers `-version` successfully.
pub fn is_available(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
