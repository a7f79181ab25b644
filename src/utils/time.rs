/// Format seconds as `MM:SS.mmm`, or `HH:MM:SS.mmm` from one hour up.
pub fn format_time(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let (hours, rem) = (total_millis / 3_600_000, total_millis % 3_600_000);
    let (minutes, rem) = (rem / 60_000, rem % 60_000);
    let (secs, millis) = (rem / 1000, rem % 1000);

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}

/// Format file size in human-readable binary units.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = None;
    for name in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = Some(name);
    }

    match unit {
        Some(name) => format!("{:.2} {}", value, name),
        None => format!("{} B", bytes),
    }
}
