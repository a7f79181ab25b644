use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use stillframe::config::AppConfig;
use stillframe::ffmpeg::{
    build_render_args, format_command_line, measure_duration, FfmpegRunner, FfprobeDuration,
    JobOutcome, JobStatus, RunnerEvent,
};
use stillframe::logging::init_logging;
use stillframe::project::{prepare_request, JobOptions, TextPosition};
use stillframe::utils::{format_size, format_time};
use stillframe::RenderError;

/// Render an image or video together with an audio track into an MP4.
#[derive(Debug, Parser)]
#[command(name = "stillframe", version)]
struct Cli {
    /// Image or video file shown for the length of the audio.
    #[arg(long)]
    media: PathBuf,

    /// Audio track.
    #[arg(long)]
    audio: PathBuf,

    /// Folder the MP4 is written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Video title, also used as the file name. Defaults to a timestamp.
    #[arg(long)]
    title: Option<String>,

    /// Text drawn over the video.
    #[arg(long, default_value = "")]
    text: String,

    #[arg(long, default_value_t = TextPosition::Center)]
    text_position: TextPosition,

    #[arg(long, default_value_t = 48)]
    text_size: u32,

    /// Color name or #rrggbb.
    #[arg(long, default_value = "white")]
    text_color: String,

    /// Fade-in length in seconds (0 disables).
    #[arg(long, default_value_t = 0.0)]
    fade_in: f64,

    /// Fade-out length in seconds (0 disables).
    #[arg(long, default_value_t = 0.0)]
    fade_out: f64,

    /// Replace the output file if it already exists.
    #[arg(long)]
    overwrite: bool,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the ffmpeg command instead of running it.
    #[arg(long)]
    print_command: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match AppConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: failed to load {}: {}", path.display(), e);
                return ExitCode::from(2);
            }
        },
        None => AppConfig::default(),
    };
    init_logging(&config.logging);

    if let Err(e) = config.tools.ensure_available() {
        eprintln!("Error: {}. Install FFmpeg or set tool paths in the config file.", e);
        return ExitCode::from(2);
    }

    match run(cli, config) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!("{:?}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

impl Cli {
    fn job_options(&self) -> JobOptions {
        JobOptions {
            media: self.media.clone(),
            audio: self.audio.clone(),
            output_dir: self.output_dir.clone(),
            title: self.title.clone(),
            text: self.text.clone(),
            text_position: self.text_position,
            text_size: self.text_size,
            text_color: self.text_color.clone(),
            fade_in: self.fade_in,
            fade_out: self.fade_out,
            overwrite: self.overwrite,
        }
    }
}

fn run(cli: Cli, config: AppConfig) -> Result<ExitCode> {
    let request = prepare_request(&cli.job_options(), &Local::now()).map_err(|e| match e {
        RenderError::OutputExists { .. } => anyhow!("{}; pass --overwrite to replace it", e),
        other => other.into(),
    })?;

    if cli.print_command {
        let ffprobe = FfprobeDuration::new(config.tools.ffprobe.clone());
        let duration = match measure_duration(&ffprobe, &request.audio_path) {
            Ok(d) => d,
            Err(e @ RenderError::Probe { .. }) => {
                eprintln!("Error: {}", e);
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => return Err(e.into()),
        };
        let args = build_render_args(&request, duration, &config.render)?;
        println!("{}", format_command_line(&config.tools.ffmpeg, &args));
        return Ok(ExitCode::SUCCESS);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create Tokio runtime")?;
    let runner = FfmpegRunner::with_ffprobe(
        config.render.clone(),
        config.tools.clone(),
        runtime.handle().clone(),
    );
    let events = runner.events();

    {
        let runner = runner.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                runner.cancel();
            }
        });
    }

    let mut status = JobStatus::new();
    if let Err(e) = runner.start(request) {
        for event in events.try_iter() {
            report(&mut status, &event);
        }
        return match e {
            RenderError::Probe { .. } => Ok(ExitCode::FAILURE),
            other => Err(other.into()),
        };
    }
    println!("Audio duration: {}", format_time(runner.audio_duration()));

    for event in events.iter() {
        let finished = matches!(event, RunnerEvent::Finished { .. });
        report(&mut status, &event);
        if finished {
            break;
        }
    }

    Ok(match status.outcome {
        Some(JobOutcome::Succeeded(_)) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Show one event: progress on stdout, diagnostics on stderr.
fn report(status: &mut JobStatus, event: &RunnerEvent) {
    status.apply(event);
    match event {
        RunnerEvent::Started => println!("{}", status.message),
        RunnerEvent::Progress(_) => {
            print!("\r{}", status.message);
            let _ = std::io::stdout().flush();
        }
        RunnerEvent::LogLine(line) => eprintln!("{}", line),
        RunnerEvent::Finished { output_path, .. } => {
            println!();
            match &status.outcome {
                Some(JobOutcome::Succeeded(_)) => {
                    let size = std::fs::metadata(output_path)
                        .map(|m| format_size(m.len()))
                        .unwrap_or_else(|_| "unknown size".to_string());
                    println!("{} ({})", status.message, size);
                }
                _ => println!("{}", status.message),
            }
        }
    }
}
