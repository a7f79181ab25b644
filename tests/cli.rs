#![cfg(unix)]

use parking_lot::{const_mutex, Mutex, MutexGuard};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

// Same ETXTBSY hazard as the runner tests: scripts are written and executed one test
// at a time.
static SPAWN_LOCK: Mutex<()> = const_mutex(());

const ENCODER_OK: &str = r#"
for arg; do out="$arg"; done
echo "out_time_us=5000000"
echo "progress=continue"
echo "out_time_us=10000000"
echo "progress=end"
echo "frame=300 fps=30.0" >&2
: > "$out"
exit 0
"#;

struct Workspace {
    dir: TempDir,
    _guard: MutexGuard<'static, ()>,
}

impl Workspace {
    fn new() -> Self {
        let guard = SPAWN_LOCK.lock();
        let ws = Self {
            dir: tempfile::tempdir().unwrap(),
            _guard: guard,
        };
        std::fs::write(ws.path("cover.png"), b"png").unwrap();
        std::fs::write(ws.path("song.mp3"), b"mp3").unwrap();
        ws
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Executable shell script that answers `-version` and otherwise runs `body`.
    fn tool(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        let script = format!(
            "#!/bin/sh\ncase \"$1\" in -version) exit 0 ;; esac\n{}\n",
            body
        );
        std::fs::write(&path, script).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    /// Config file pointing at the given tools; the reported audio length is `duration`.
    fn config(&self, encoder_body: &str, duration: &str) -> PathBuf {
        let ffmpeg = self.tool("fake-ffmpeg", encoder_body);
        let inspector = self.tool(
            "fake-inspector",
            &format!("echo '{{\"format\":{{\"duration\":\"{}\"}}}}'", duration),
        );
        self.write_config(&ffmpeg.to_string_lossy(), &inspector.to_string_lossy())
    }

    fn write_config(&self, encoder: &str, inspector: &str) -> PathBuf {
        let path = self.path("config.json");
        let json = serde_json::json!({ "tools": { "ffmpeg": encoder, "ffprobe": inspector } });
        std::fs::write(&path, json.to_string()).unwrap();
        path
    }

    fn run(&self, config: &Path, extra: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_stillframe"))
            .current_dir(self.dir.path())
            .arg("--config")
            .arg(config)
            .args(["--media", "cover.png", "--audio", "song.mp3", "--title", "clip"])
            .args(extra)
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn successful_render_exits_zero() {
    let ws = Workspace::new();
    let config = ws.config(ENCODER_OK, "10.0");

    let output = ws.run(&config, &[]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr_of(&output));
    assert!(ws.path("clip.mp4").exists());
    assert!(stderr_of(&output).contains("frame=300"));
}

#[test]
fn failing_encoder_exits_one() {
    let ws = Workspace::new();
    let config = ws.config("echo 'Conversion failed!' >&2\nexit 1", "10.0");

    let output = ws.run(&config, &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("Conversion failed!"));
}

#[test]
fn missing_tool_exits_two() {
    let ws = Workspace::new();
    let inspector = ws.tool("fake-inspector", "exit 0");
    let config = ws.write_config(
        &ws.path("no-such-ffmpeg").to_string_lossy(),
        &inspector.to_string_lossy(),
    );

    let output = ws.run(&config, &[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("no-such-ffmpeg"));
}

#[test]
fn existing_output_is_refused_without_overwrite() {
    let ws = Workspace::new();
    let config = ws.config(ENCODER_OK, "10.0");
    std::fs::write(ws.path("clip.mp4"), b"keep me").unwrap();

    let output = ws.run(&config, &[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("--overwrite"));
    assert_eq!(std::fs::read(ws.path("clip.mp4")).unwrap(), b"keep me");

    let output = ws.run(&config, &["--overwrite"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr_of(&output));
    assert!(std::fs::read(ws.path("clip.mp4")).unwrap().is_empty());
}

#[test]
fn missing_inputs_exit_two() {
    let ws = Workspace::new();
    let config = ws.config(ENCODER_OK, "10.0");
    std::fs::remove_file(ws.path("song.mp3")).unwrap();

    let output = ws.run(&config, &[]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("audio file not found"));

    std::fs::write(ws.path("song.mp3"), b"mp3").unwrap();
    let output = ws.run(&config, &["--output-dir", "missing"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_of(&output).contains("output directory not found"));
}

#[test]
fn zero_length_audio_fails_without_encoding() {
    let ws = Workspace::new();
    let config = ws.config("touch encoder-ran\nexit 0", "0.0");

    let output = ws.run(&config, &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!ws.path("encoder-ran").exists());

    let output = ws.run(&config, &["--print-command"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn print_command_skips_blank_text() {
    let ws = Workspace::new();
    let config = ws.config(ENCODER_OK, "10.0");

    let output = ws.run(&config, &["--print-command", "--text", " "]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr_of(&output));
    let line = String::from_utf8_lossy(&output.stdout);
    assert!(line.contains("fake-ffmpeg"));
    assert!(!line.contains("drawtext"));
    assert!(!ws.path("clip.mp4").exists());
}
