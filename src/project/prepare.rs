use super::naming::{resolve_output_path, resolve_title};
use super::request::{RenderRequest, TextPosition};
use crate::error::{RenderError, RenderResult};
use chrono::{DateTime, TimeZone};
use std::path::PathBuf;

/// What a user asks for, before any file checks or naming.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOptions {
    pub media: PathBuf,
    pub audio: PathBuf,
    pub output_dir: PathBuf,
    pub title: Option<String>,
    pub text: String,
    pub text_position: TextPosition,
    pub text_size: u32,
    pub text_color: String,
    pub fade_in: f64,
    pub fade_out: f64,
    pub overwrite: bool,
}

impl JobOptions {
    pub fn new(
        media: impl Into<PathBuf>,
        audio: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            media: media.into(),
            audio: audio.into(),
            output_dir: output_dir.into(),
            title: None,
            text: String::new(),
            text_position: TextPosition::Center,
            text_size: 48,
            text_color: "white".to_string(),
            fade_in: 0.0,
            fade_out: 0.0,
            overwrite: false,
        }
    }
}

/// Turn options into a ready request.
///
/// Inputs must exist as files and the output folder as a directory. An existing output
/// file is refused unless `overwrite` is set. Whitespace-only overlay text disables the
/// overlay.
pub fn prepare_request<Tz: TimeZone>(
    options: &JobOptions,
    now: &DateTime<Tz>,
) -> RenderResult<RenderRequest>
where
    Tz::Offset: std::fmt::Display,
{
    if !options.media.is_file() {
        return Err(RenderError::invalid_request(format!(
            "media file not found: {}",
            options.media.display()
        )));
    }
    if !options.audio.is_file() {
        return Err(RenderError::invalid_request(format!(
            "audio file not found: {}",
            options.audio.display()
        )));
    }
    if !options.output_dir.is_dir() {
        return Err(RenderError::invalid_request(format!(
            "output directory not found: {}",
            options.output_dir.display()
        )));
    }

    let title = resolve_title(options.title.as_deref(), now);
    let output_path = resolve_output_path(&options.output_dir, &title)?;
    if output_path.exists() && !options.overwrite {
        return Err(RenderError::OutputExists { path: output_path });
    }

    let request = RenderRequest::new(&options.media, &options.audio, output_path, title)
        .with_text(
            options.text.trim(),
            options.text_position,
            options.text_size,
            options.text_color.clone(),
        )
        .with_fades(options.fade_in, options.fade_out);
    request.validate()?;
    Ok(request)
}
