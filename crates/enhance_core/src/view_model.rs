use crate::{JobId, JobPhase, MediaSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecyclePhase {
    #[default]
    Idle,
    Uploading,
    Processing,
    Completed,
    Errored,
}

impl From<JobPhase> for LifecyclePhase {
    fn from(phase: JobPhase) -> Self {
        match phase {
            JobPhase::Uploading => LifecyclePhase::Uploading,
            JobPhase::Processing => LifecyclePhase::Processing,
            JobPhase::Completed => LifecyclePhase::Completed,
            JobPhase::Errored => LifecyclePhase::Errored,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Processing,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: LifecyclePhase,
    pub job_id: Option<JobId>,
    pub input_name: Option<String>,
    pub input_size: Option<u64>,
    pub can_start: bool,
    pub can_download: bool,
    pub progress_visible: bool,
    pub displayed_progress: u8,
    /// The bar is still moving towards its latest target.
    pub progress_animating: bool,
    pub status: Option<StatusLine>,
    pub original: Option<MediaSource>,
    pub enhanced: Option<MediaSource>,
    pub media_session: u64,
    pub server_reachable: Option<bool>,
}

impl AppViewModel {
    pub fn progress_text(&self) -> String {
        format!("Processing... {}%", self.displayed_progress)
    }
}

/// Human readable size with base-1024 units, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// `m:ss` rendering of a duration in seconds.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes_use_binary_units_and_trim_zeros() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
    }

    #[test]
    fn durations_pad_seconds() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(65.9), "1:05");
        assert_eq!(format_duration(600.0), "10:00");
    }
}
