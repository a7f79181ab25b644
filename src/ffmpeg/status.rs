use super::runner::RunnerEvent;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded(PathBuf),
    Failed(i32),
}

/// What a front end shows for one job: status text, progress bar and log panel.
#[derive(Debug, Clone, Default)]
pub struct JobStatus {
    pub message: String,
    pub percent: u8,
    pub log: Vec<String>,
    pub outcome: Option<JobOutcome>,
}

impl JobStatus {
    pub fn new() -> Self {
        Self {
            message: "Ready".to_string(),
            ..Default::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Some(JobOutcome::Failed(_)))
    }

    /// Fold one runner event into the view.
    pub fn apply(&mut self, event: &RunnerEvent) {
        match event {
            RunnerEvent::Started => {
                self.message = "Rendering...".to_string();
                self.percent = 0;
                self.outcome = None;
            }
            RunnerEvent::Progress(pct) => {
                self.percent = (*pct).min(100);
                self.message = format!("Rendering... {}%", self.percent);
            }
            RunnerEvent::LogLine(line) => self.log.push(line.clone()),
            RunnerEvent::Finished {
                exit_code: 0,
                output_path,
            } => {
                self.percent = 100;
                self.message = format!("Done: {}", output_path.display());
                self.outcome = Some(JobOutcome::Succeeded(output_path.clone()));
            }
            RunnerEvent::Finished { exit_code, .. } => {
                self.message = format!("Failed (code {})", exit_code);
                self.outcome = Some(JobOutcome::Failed(*exit_code));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_flow() {
        let mut status = JobStatus::new();
        assert_eq!(status.message, "Ready");

        status.apply(&RunnerEvent::Started);
        status.apply(&RunnerEvent::Progress(42));
        assert_eq!(status.message, "Rendering... 42%");

        status.apply(&RunnerEvent::LogLine("frame=1".to_string()));
        status.apply(&RunnerEvent::Finished {
            exit_code: 0,
            output_path: PathBuf::from("/out/a.mp4"),
        });

        assert!(status.is_complete());
        assert!(!status.is_error());
        assert_eq!(status.percent, 100);
        assert_eq!(status.log, vec!["frame=1".to_string()]);
        assert_eq!(
            status.outcome,
            Some(JobOutcome::Succeeded(PathBuf::from("/out/a.mp4")))
        );
    }

    #[test]
    fn test_failure_keeps_progress() {
        let mut status = JobStatus::new();
        status.apply(&RunnerEvent::Started);
        status.apply(&RunnerEvent::Progress(30));
        status.apply(&RunnerEvent::Finished {
            exit_code: 255,
            output_path: PathBuf::from("/out/a.mp4"),
        });

        assert!(status.is_error());
        assert_eq!(status.percent, 30);
        assert_eq!(status.message, "Failed (code 255)");
    }
}
