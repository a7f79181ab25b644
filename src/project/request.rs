use crate::error::RenderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Vertical placement of the text overlay. Text is always centered horizontally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPosition {
    Top,
    #[default]
    Center,
    Bottom,
}

impl TextPosition {
    pub fn all() -> &'static [TextPosition] {
        &[TextPosition::Top, TextPosition::Center, TextPosition::Bottom]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextPosition::Top => "top",
            TextPosition::Center => "center",
            TextPosition::Bottom => "bottom",
        }
    }

    /// drawtext `x`/`y` expressions for this position.
    pub fn coordinates(&self, margin: u32) -> (String, String) {
        let x = "(w-text_w)/2".to_string();
        let y = match self {
            TextPosition::Top => margin.to_string(),
            TextPosition::Center => "(h-text_h)/2".to_string(),
            TextPosition::Bottom => format!("h-th-{}", margin),
        };
        (x, y)
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextPosition {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextPosition::all()
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                RenderError::invalid_request(format!(
                    "unknown text position '{}' (expected top, center or bottom)",
                    s
                ))
            })
    }
}

/// One render job: what to combine, where to write it, and how to decorate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub media_path: PathBuf,
    pub audio_path: PathBuf,
    pub output_path: PathBuf,
    pub title: String,
    /// Empty disables the overlay.
    pub text_overlay: String,
    pub text_position: TextPosition,
    pub text_size: u32,
    pub text_color: String,
    pub fade_in_seconds: f64,
    pub fade_out_seconds: f64,
}

impl RenderRequest {
    pub fn new(
        media_path: impl Into<PathBuf>,
        audio_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            media_path: media_path.into(),
            audio_path: audio_path.into(),
            output_path: output_path.into(),
            title: title.into(),
            text_overlay: String::new(),
            text_position: TextPosition::Center,
            text_size: 48,
            text_color: "white".to_string(),
            fade_in_seconds: 0.0,
            fade_out_seconds: 0.0,
        }
    }

    pub fn with_text(
        mut self,
        text: impl Into<String>,
        position: TextPosition,
        size: u32,
        color: impl Into<String>,
    ) -> Self {
        self.text_overlay = text.into();
        self.text_position = position;
        self.text_size = size;
        self.text_color = color.into();
        self
    }

    pub fn with_fades(mut self, fade_in_seconds: f64, fade_out_seconds: f64) -> Self {
        self.fade_in_seconds = fade_in_seconds;
        self.fade_out_seconds = fade_out_seconds;
        self
    }

    pub fn has_text(&self) -> bool {
        !self.text_overlay.is_empty()
    }

    /// Structural checks only; file existence is the caller's business.
    pub fn validate(&self) -> Result<(), RenderError> {
        let media_missing = self.media_path.as_os_str().is_empty();
        let audio_missing = self.audio_path.as_os_str().is_empty();
        match (media_missing, audio_missing) {
            (true, true) => {
                return Err(RenderError::invalid_request(
                    "neither a media file nor an audio file was given",
                ))
            }
            (true, false) => return Err(RenderError::invalid_request("no media file given")),
            (false, true) => return Err(RenderError::invalid_request("no audio file given")),
            (false, false) => {}
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(RenderError::invalid_request("no output path given"));
        }
        for (name, value) in [
            ("fade in", self.fade_in_seconds),
            ("fade out", self.fade_out_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RenderError::invalid_request(format!(
                    "{} must be a non-negative number of seconds, got {}",
                    name, value
                )));
            }
        }
        if self.has_text() && self.text_size == 0 {
            return Err(RenderError::invalid_request("text size must be positive"));
        }
        Ok(())
    }
}
