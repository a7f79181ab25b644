use crate::config::RenderConfig;
use crate::error::RenderResult;
use crate::project::RenderRequest;
use std::path::Path;

/// Extensions decoded as moving video. Anything else is treated as a still image.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "webm", "flv", "wmv", "m4v", "mpg", "mpeg",
];

/// How the primary media input is fed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Decoded normally.
    Video,
    /// Looped single frame, encoded with `-tune stillimage`.
    StillImage,
}

impl InputKind {
    pub fn classify(path: &Path) -> Self {
        if is_video_file(path) {
            InputKind::Video
        } else {
            InputKind::StillImage
        }
    }

    pub fn loops(&self) -> bool {
        matches!(self, InputKind::StillImage)
    }
}

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Start time of a fade-out ending at `duration`, never negative.
pub fn fade_out_start(duration: f64, fade_out: f64) -> f64 {
    (duration - fade_out).max(0.0)
}

/// Escape text for a drawtext `text='...'` value.
pub fn escape_drawtext(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | ':' | '\'') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Inverse of [`escape_drawtext`].
pub fn unescape_drawtext(escaped: &str) -> String {
    let mut text = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                text.push(next);
                continue;
            }
        }
        text.push(c);
    }
    text
}

/// Video filter chain: scale/pad, fade in, fade out, text. Order matters.
pub fn build_video_filters(
    request: &RenderRequest,
    media_duration: f64,
    config: &RenderConfig,
) -> Vec<String> {
    let (w, h) = (config.width, config.height);
    let mut filters = vec![format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2"
    )];

    if request.fade_in_seconds > 0.0 {
        filters.push(format!("fade=t=in:st=0:d={}", request.fade_in_seconds));
    }
    if request.fade_out_seconds > 0.0 {
        filters.push(format!(
            "fade=t=out:st={}:d={}",
            fade_out_start(media_duration, request.fade_out_seconds),
            request.fade_out_seconds
        ));
    }

    if request.has_text() {
        let (x, y) = request.text_position.coordinates(config.text_margin);
        filters.push(format!(
            "drawtext=text='{}':fontsize={}:fontcolor={}:x={}:y={}",
            escape_drawtext(&request.text_overlay),
            request.text_size,
            request.text_color,
            x,
            y
        ));
    }

    filters
}

/// Audio fades, mirroring the video fade timing.
pub fn build_audio_filters(request: &RenderRequest, media_duration: f64) -> Vec<String> {
    let mut filters = Vec::new();
    if request.fade_in_seconds > 0.0 {
        filters.push(format!("afade=t=in:st=0:d={}", request.fade_in_seconds));
    }
    if request.fade_out_seconds > 0.0 {
        filters.push(format!(
            "afade=t=out:st={}:d={}",
            fade_out_start(media_duration, request.fade_out_seconds),
            request.fade_out_seconds
        ));
    }
    filters
}

/// Build the full encoder argument list (without the program name).
///
/// `media_duration` places the fade-out; it may be 0 when no fade-out is requested.
pub fn build_render_args(
    request: &RenderRequest,
    media_duration: f64,
    config: &RenderConfig,
) -> RenderResult<Vec<String>> {
    request.validate()?;

    let input = InputKind::classify(&request.media_path);
    let mut args = vec!["-y".to_string()];

    if input.loops() {
        args.push("-loop".to_string());
        args.push("1".to_string());
    }
    args.push("-i".to_string());
    args.push(request.media_path.to_string_lossy().to_string());
    args.push("-i".to_string());
    args.push(request.audio_path.to_string_lossy().to_string());

    args.extend([
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        config.preset.clone(),
        "-crf".to_string(),
        config.crf.to_string(),
    ]);
    if input == InputKind::StillImage {
        args.push("-tune".to_string());
        args.push("stillimage".to_string());
    }

    args.extend([
        "-vf".to_string(),
        build_video_filters(request, media_duration, config).join(","),
        "-r".to_string(),
        config.fps.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ]);

    args.extend([
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        config.audio_bitrate.clone(),
    ]);
    let audio_filters = build_audio_filters(request, media_duration);
    if !audio_filters.is_empty() {
        args.push("-af".to_string());
        args.push(audio_filters.join(","));
    }

    args.push("-shortest".to_string());

    args.extend(
        [
            "-movflags",
            "+faststart",
            "-color_primaries",
            "bt709",
            "-color_trc",
            "bt709",
            "-colorspace",
            "bt709",
        ]
        .map(String::from),
    );
    args.push("-metadata".to_string());
    args.push(format!("title={}", request.title));
    args.push("-progress".to_string());
    args.push("pipe:1".to_string());
    args.push(request.output_path.to_string_lossy().to_string());

    Ok(args)
}

/// Render a command for logs, quoting arguments that contain whitespace.
pub fn format_command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|arg| {
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                format!("\"{}\"", arg.replace('"', "\\\""))
            } else {
                arg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
