use crate::error::{RenderError, RenderResult};
use serde::Deserialize;
use std::path::Path;
use std::process::{Command, Stdio};

/// Source of media durations. The runner calls this once per job, before spawning.
pub trait DurationProbe: Send + Sync {
    fn duration_seconds(&self, path: &Path) -> RenderResult<f64>;
}

/// Asks `ffprobe` for the container duration.
#[derive(Debug, Clone)]
pub struct FfprobeDuration {
    ffprobe_path: String,
}

impl FfprobeDuration {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FFProbeOutput {
    format: Option<FFProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct FFProbeFormat {
    duration: Option<String>,
}

impl DurationProbe for FfprobeDuration {
    fn duration_seconds(&self, path: &Path) -> RenderResult<f64> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RenderError::probe(path, format!("could not run ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::probe(
                path,
                format!("ffprobe failed: {}", stderr.trim()),
            ));
        }

        parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
            .map_err(|message| RenderError::probe(path, message))
    }
}

/// Always reports the same duration. Useful for dry runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedDuration(pub f64);

impl DurationProbe for FixedDuration {
    fn duration_seconds(&self, _path: &Path) -> RenderResult<f64> {
        Ok(self.0)
    }
}

/// Probe `path` and insist on a usable length. Zero, negative and non-finite durations
/// count as probe failures.
pub fn measure_duration(probe: &dyn DurationProbe, path: &Path) -> RenderResult<f64> {
    let duration = probe.duration_seconds(path)?;
    if duration.is_finite() && duration > 0.0 {
        Ok(duration)
    } else {
        Err(RenderError::probe(path, format!("audio is {}s long", duration)))
    }
}

/// Extract `format.duration` from ffprobe's JSON output.
fn parse_probe_duration(json_str: &str) -> Result<f64, String> {
    let probe_output: FFProbeOutput = serde_json::from_str(json_str)
        .map_err(|e| format!("Failed to parse ffprobe output: {}", e))?;

    let duration = probe_output
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| "ffprobe reported no duration".to_string())?;

    duration
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("unreadable duration '{}'", duration))
}
