//! Terminal rendering of the view model.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::time::Instant;

use engine_logging::{engine_info, engine_warn};
use enhance_core::{
    format_duration, format_file_size, AppViewModel, JobId, LifecyclePhase, MediaSource, Severity,
    StatusLine,
};

const BAR_WIDTH: usize = 25;

/// Receives the media pair whenever the playback session changes.
pub trait MediaPresenter {
    fn present(&mut self, original: Option<&str>, enhanced: Option<&str>) -> io::Result<()>;
}

/// Prints where the original and enhanced audio can be opened from.
pub struct TerminalPresenter<W: Write> {
    out: W,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> MediaPresenter for TerminalPresenter<W> {
    fn present(&mut self, original: Option<&str>, enhanced: Option<&str>) -> io::Result<()> {
        if let Some(original) = original {
            writeln!(self.out, "  original: {original}")?;
        }
        if let Some(enhanced) = enhanced {
            writeln!(self.out, "  enhanced: {enhanced}")?;
        }
        self.out.flush()
    }
}

/// Hands each new enhanced source to an external player program.
pub struct PlayerPresenter<P> {
    inner: P,
    program: String,
}

impl<P: MediaPresenter> PlayerPresenter<P> {
    pub fn new(inner: P, program: String) -> Self {
        Self { inner, program }
    }
}

impl<P: MediaPresenter> MediaPresenter for PlayerPresenter<P> {
    fn present(&mut self, original: Option<&str>, enhanced: Option<&str>) -> io::Result<()> {
        self.inner.present(original, enhanced)?;
        let Some(enhanced) = enhanced else {
            return Ok(());
        };
        match Command::new(&self.program)
            .arg(enhanced)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => engine_info!("started {} (pid {})", self.program, child.id()),
            Err(err) => engine_warn!("could not start player {}: {}", self.program, err),
        }
        Ok(())
    }
}

#[derive(Default)]
struct Rendered {
    input: Option<(String, Option<u64>)>,
    progress: Option<u8>,
    status: Option<StatusLine>,
    media_session: u64,
}

/// Writes only what changed since the previous frame. Progress is redrawn
/// in place on one line.
pub struct TerminalRenderer<W: Write> {
    out: W,
    last: Rendered,
    progress_open: bool,
    job_started: Option<(JobId, Instant)>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last: Rendered::default(),
            progress_open: false,
            job_started: None,
        }
    }

    pub fn render(
        &mut self,
        view: &AppViewModel,
        media: &mut dyn MediaPresenter,
        resolve: &dyn Fn(&MediaSource) -> String,
    ) -> io::Result<()> {
        self.track_job(view);

        let input = view
            .input_name
            .clone()
            .map(|name| (name, view.input_size));
        if input != self.last.input {
            if let Some((name, size)) = &input {
                self.line(&describe_input(name, *size))?;
            }
            self.last.input = input;
        }

        let progress = view.progress_visible.then_some(view.displayed_progress);
        if progress != self.last.progress {
            if let Some(value) = progress {
                write!(self.out, "\r{}", progress_bar(value))?;
                self.progress_open = true;
            }
            self.last.progress = progress;
        }

        if view.status != self.last.status {
            if let Some(status) = &view.status {
                let mut text = status_text(status);
                if let Some(elapsed) = self.elapsed_if_terminal(view) {
                    text.push_str(&format!(" ({elapsed})"));
                }
                self.line(&text)?;
            }
            self.last.status = view.status.clone();
        }

        if view.media_session != self.last.media_session {
            self.close_progress()?;
            self.last.media_session = view.media_session;
            let original = view.original.as_ref().map(resolve);
            let enhanced = view.enhanced.as_ref().map(resolve);
            media.present(original.as_deref(), enhanced.as_deref())?;
        }

        self.out.flush()
    }

    /// Multi-line summary for the interactive `status` command.
    pub fn summary(&mut self, view: &AppViewModel) -> io::Result<()> {
        let mut lines = vec![format!("phase: {}", phase_name(view.phase))];
        if let Some(name) = &view.input_name {
            lines.push(format!("input: {}", describe_input(name, view.input_size)));
        }
        if view.progress_visible {
            lines.push(view.progress_text());
        }
        if let Some(status) = &view.status {
            lines.push(status_text(status));
        }
        lines.push(format!(
            "server: {}",
            match view.server_reachable {
                Some(true) => "reachable",
                Some(false) => "unreachable",
                None => "not checked",
            }
        ));
        lines.push(format!(
            "enhance: {}, download: {}",
            availability(view.can_start),
            availability(view.can_download)
        ));
        for line in lines {
            self.line(&line)?;
        }
        self.out.flush()
    }

    pub fn message(&mut self, text: &str) -> io::Result<()> {
        self.line(text)?;
        self.out.flush()
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        self.close_progress()?;
        writeln!(self.out, "{text}")
    }

    fn close_progress(&mut self) -> io::Result<()> {
        if std::mem::take(&mut self.progress_open) {
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn track_job(&mut self, view: &AppViewModel) {
        match (view.job_id, self.job_started) {
            (Some(id), Some((started, _))) if id == started => {}
            (Some(id), _) => self.job_started = Some((id, Instant::now())),
            (None, _) => self.job_started = None,
        }
    }

    fn elapsed_if_terminal(&self, view: &AppViewModel) -> Option<String> {
        if !matches!(view.phase, LifecyclePhase::Completed | LifecyclePhase::Errored) {
            return None;
        }
        let (_, started) = self.job_started?;
        Some(format_duration(started.elapsed().as_secs_f64()))
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn progress_bar(value: u8) -> String {
    let filled = usize::from(value.min(100)) * BAR_WIDTH / 100;
    format!(
        "[{}{}] Processing... {}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        value
    )
}

fn describe_input(name: &str, size: Option<u64>) -> String {
    match size {
        Some(size) => format!("Selected {name} ({})", format_file_size(size)),
        None => format!("Selected sample {name}"),
    }
}

fn status_text(status: &StatusLine) -> String {
    let tag = match status.severity {
        Severity::Processing => "..",
        Severity::Success => "ok",
        Severity::Error => "!!",
    };
    format!("[{tag}] {}", status.message)
}

fn phase_name(phase: LifecyclePhase) -> &'static str {
    match phase {
        LifecyclePhase::Idle => "idle",
        LifecyclePhase::Uploading => "uploading",
        LifecyclePhase::Processing => "processing",
        LifecyclePhase::Completed => "completed",
        LifecyclePhase::Errored => "errored",
    }
}

fn availability(enabled: bool) -> &'static str {
    if enabled {
        "available"
    } else {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[derive(Default)]
    struct Recorded(Vec<(Option<String>, Option<String>)>);

    impl MediaPresenter for Recorded {
        fn present(&mut self, original: Option<&str>, enhanced: Option<&str>) -> io::Result<()> {
            self.0
                .push((original.map(str::to_owned), enhanced.map(str::to_owned)));
            Ok(())
        }
    }

    fn resolve(source: &MediaSource) -> String {
        match source {
            MediaSource::LocalFile(path) | MediaSource::Owned(path) => path.display().to_string(),
            MediaSource::ServerResult { file_name } => format!("http://host/download/{file_name}"),
        }
    }

    fn status(severity: Severity, message: &str) -> Option<StatusLine> {
        Some(StatusLine {
            severity,
            message: message.to_string(),
        })
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(
            progress_bar(0),
            "[-------------------------] Processing... 0%"
        );
        assert_eq!(
            progress_bar(40),
            "[##########---------------] Processing... 40%"
        );
        assert_eq!(
            progress_bar(100),
            "[#########################] Processing... 100%"
        );
    }

    #[test]
    fn unchanged_view_writes_nothing_new() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let mut media = Recorded::default();
        let view = AppViewModel {
            input_name: Some("noisy.wav".into()),
            input_size: Some(1536),
            status: status(Severity::Processing, "Uploading audio..."),
            ..AppViewModel::default()
        };
        renderer.render(&view, &mut media, &resolve).unwrap();
        renderer.render(&view, &mut media, &resolve).unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "Selected noisy.wav (1.5 KB)\n[..] Uploading audio...\n");
    }

    #[test]
    fn progress_redraws_in_place_and_status_starts_new_line() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let mut media = Recorded::default();
        let mut view = AppViewModel {
            progress_visible: true,
            displayed_progress: 10,
            ..AppViewModel::default()
        };
        renderer.render(&view, &mut media, &resolve).unwrap();
        view.displayed_progress = 20;
        renderer.render(&view, &mut media, &resolve).unwrap();
        view.status = status(Severity::Error, "Error: too large");
        renderer.render(&view, &mut media, &resolve).unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.starts_with("\r[##"));
        assert!(out.contains("Processing... 10%\r["));
        assert!(out.ends_with("Processing... 20%\n[!!] Error: too large\n"));
    }

    #[test]
    fn media_is_presented_once_per_session() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let mut media = Recorded::default();
        let mut view = AppViewModel {
            original: Some(MediaSource::LocalFile(PathBuf::from("/audio/noisy.wav"))),
            media_session: 1,
            ..AppViewModel::default()
        };
        renderer.render(&view, &mut media, &resolve).unwrap();
        renderer.render(&view, &mut media, &resolve).unwrap();
        view.enhanced = Some(MediaSource::ServerResult {
            file_name: "x.wav".into(),
        });
        view.media_session = 2;
        renderer.render(&view, &mut media, &resolve).unwrap();

        assert_eq!(
            media.0,
            vec![
                (Some("/audio/noisy.wav".into()), None),
                (
                    Some("/audio/noisy.wav".into()),
                    Some("http://host/download/x.wav".into())
                ),
            ]
        );
    }

    #[test]
    fn terminal_status_carries_elapsed_time() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let mut media = Recorded::default();
        let mut view = AppViewModel {
            phase: LifecyclePhase::Processing,
            job_id: Some(3),
            ..AppViewModel::default()
        };
        renderer.render(&view, &mut media, &resolve).unwrap();
        view.phase = LifecyclePhase::Completed;
        view.status = status(Severity::Success, "Enhancement completed successfully!");
        renderer.render(&view, &mut media, &resolve).unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "[ok] Enhancement completed successfully! (0:00)\n");
    }

    #[test]
    fn summary_lists_availability() {
        let mut renderer = TerminalRenderer::new(Vec::new());
        let view = AppViewModel {
            server_reachable: Some(false),
            can_start: true,
            ..AppViewModel::default()
        };
        renderer.summary(&view).unwrap();
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(
            out,
            "phase: idle\nserver: unreachable\nenhance: available, download: unavailable\n"
        );
    }
}
