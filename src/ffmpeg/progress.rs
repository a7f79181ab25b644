/// Keys carrying elapsed output time in microseconds.
///
/// ffmpeg writes `out_time_ms` in microseconds too, despite the name.
const ELAPSED_KEYS: &[&str] = &["out_time_us", "out_time_ms"];

/// Split one `-progress` record (`key=value`) into its parts.
pub fn parse_progress_record(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.trim().split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// Elapsed seconds from a single record, if it is an elapsed-time record.
///
/// `N/A` and garbage are ignored; negative values (seen before the first frame) count as zero.
pub fn parse_elapsed_seconds(line: &str) -> Option<f64> {
    let (key, value) = parse_progress_record(line)?;
    if !ELAPSED_KEYS.contains(&key) {
        return None;
    }
    let micros: i64 = value.parse().ok()?;
    Some(micros.max(0) as f64 / 1_000_000.0)
}

/// Percentage of `total` covered by `elapsed`, truncated and clamped to 0..=100.
pub fn percent_of(elapsed: f64, total: f64) -> Option<u8> {
    if total.is_nan() || total <= 0.0 || !elapsed.is_finite() {
        return None;
    }
    Some((elapsed / total * 100.0).clamp(0.0, 100.0) as u8)
}

/// Turns raw stdout chunks of `ffmpeg -progress pipe:1` into percentages.
///
/// Reported values never go down within one job.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_seconds: f64,
    pending: String,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total_seconds: f64) -> Self {
        Self {
            total_seconds,
            pending: String::new(),
            last_percent: None,
        }
    }

    /// Consume one chunk. Returns a percentage if the chunk held at least one elapsed-time
    /// record and the total duration is known.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<u8> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));

        let complete = match self.pending.rfind('\n') {
            Some(idx) => {
                let rest = self.pending.split_off(idx + 1);
                std::mem::replace(&mut self.pending, rest)
            }
            None => return None,
        };

        self.scan(&complete)
    }

    /// Flush a trailing record that arrived without a newline.
    pub fn finish(&mut self) -> Option<u8> {
        let rest = std::mem::take(&mut self.pending);
        self.scan(&rest)
    }

    fn scan(&mut self, text: &str) -> Option<u8> {
        let mut found = None;
        for line in text.lines() {
            if let Some(pct) = parse_elapsed_seconds(line).and_then(|s| percent_of(s, self.total_seconds)) {
                found = Some(found.map_or(pct, |f: u8| f.max(pct)));
            }
        }

        let pct = found?;
        let pct = self.last_percent.map_or(pct, |last| last.max(pct));
        self.last_percent = Some(pct);
        Some(pct)
    }
}
