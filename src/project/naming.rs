use chrono::{DateTime, TimeZone};
use std::path::{Path, PathBuf};

/// Title used when the user leaves it blank.
pub fn default_title<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("stillframe-%Y%m%d-%H%M%S").to_string()
}

/// Turn free text into something safe to use as a file stem.
///
/// Runs of characters other than letters, digits (any script), `_`, `-`, `.` and the plain
/// space become a single `_`. Space runs then collapse to one space, and an empty result
/// becomes "output".
pub fn sanitize_filename(name: &str) -> String {
    let mut replaced = String::with_capacity(name.len());
    let mut in_bad_run = false;
    for c in name.trim().chars() {
        let allowed = c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ');
        if allowed {
            replaced.push(c);
            in_bad_run = false;
        } else if !in_bad_run {
            replaced.push('_');
            in_bad_run = true;
        }
    }

    let collapsed = replaced
        .split(' ')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if collapsed.is_empty() {
        "output".to_string()
    } else {
        collapsed
    }
}

/// Final title for a job: the user's text if any, else a timestamp, always sanitized.
pub fn resolve_title<Tz: TimeZone>(user_title: Option<&str>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match user_title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => sanitize_filename(title),
        None => sanitize_filename(&default_title(now)),
    }
}

/// `<dir>/<title>.mp4`, made absolute against the current directory.
pub fn resolve_output_path(output_dir: &Path, title: &str) -> std::io::Result<PathBuf> {
    let path = output_dir.join(format!("{}.mp4", title));
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("  My Song  "), "My Song");
        assert_eq!(sanitize_filename("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_filename("what?!*"), "what_");
        assert_eq!(sanitize_filename("tab\there   and  there"), "tab_here and there");
        assert_eq!(sanitize_filename("two\n\nlines"), "two_lines");
        assert_eq!(sanitize_filename("???"), "_");
        assert_eq!(sanitize_filename("   "), "output");
        assert_eq!(sanitize_filename("v1.0-final_cut"), "v1.0-final_cut");
    }

    #[test]
    fn test_sanitize_keeps_non_ascii_letters() {
        assert_eq!(sanitize_filename("Música Café"), "Música Café");
        assert_eq!(sanitize_filename("Ведьмак 3"), "Ведьмак 3");
        assert_eq!(sanitize_filename("東京 / 夜"), "東京 _ 夜");
    }

    #[test]
    fn test_resolve_title() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(resolve_title(None, &now), "stillframe-20240309-140507");
        assert_eq!(resolve_title(Some("   "), &now), "stillframe-20240309-140507");
        assert_eq!(resolve_title(Some("Live: set"), &now), "Live_ set");
    }

    #[test]
    fn test_resolve_output_path() {
        let path = resolve_output_path(Path::new("/videos"), "clip").unwrap();
        assert_eq!(path, PathBuf::from("/videos/clip.mp4"));

        let relative = resolve_output_path(Path::new("out"), "clip").unwrap();
        assert!(relative.is_absolute());
        assert!(relative.ends_with("out/clip.mp4"));
    }
}
