//! Combine a still image or video clip with an audio track into an MP4 by driving `ffmpeg`.
//!
//! [`ffmpeg::build_render_args`] turns a [`project::RenderRequest`] into an encoder command
//! line, and [`ffmpeg::FfmpegRunner`] runs it, reporting progress and the outcome as
//! [`ffmpeg::RunnerEvent`]s.

pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod logging;
pub mod project;
pub mod utils;

pub use error::{RenderError, RenderResult};
