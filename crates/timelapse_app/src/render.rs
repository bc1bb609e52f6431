use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use timelapse_core::{AppViewModel, DownloadState, NoticeLevel, Stage};
use timelapse_engine::format_size;

/// Draws view models on the terminal: status lines plus a progress bar while
/// an upload is outstanding.
pub struct Renderer {
    previous: AppViewModel,
    bar: Option<ProgressBar>,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            previous: AppViewModel::default(),
            bar: None,
        }
    }

    pub fn render(&mut self, view: &AppViewModel) {
        for line in status_lines(&self.previous, view) {
            match &self.bar {
                Some(bar) => bar.println(line),
                None => eprintln!("{line}"),
            }
        }

        if view.show_progress {
            let bar = self.bar.get_or_insert_with(|| new_bar(view));
            bar.set_position(view.progress.round() as u64);
        } else if let Some(bar) = self.bar.take() {
            match view.stage {
                Stage::Succeeded => {
                    bar.set_position(100);
                    bar.finish_with_message("done");
                }
                _ => bar.abandon(),
            }
        }

        self.previous = view.clone();
    }
}

fn new_bar(view: &AppViewModel) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>3}%  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    bar.set_prefix(view.file_name.clone().unwrap_or_default());
    bar.set_message("processing");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Lines worth printing for the change from `before` to `after`.
pub fn status_lines(before: &AppViewModel, after: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    if after.file_name != before.file_name || after.file_size != before.file_size {
        if let (Some(name), Some(size)) = (&after.file_name, after.file_size) {
            lines.push(format!("Selected {name} ({})", format_size(size)));
        }
    }

    let summary = |view: &AppViewModel| view.preview.as_ref().and_then(|p| p.summary.clone());
    if let Some(summary) = summary(after).filter(|text| Some(text) != summary(before).as_ref()) {
        lines.push(format!("Preview: {summary}"));
    }

    if after.stage == Stage::Submitting && before.stage != Stage::Submitting {
        lines.push(format!(
            "Uploading at {}x, {} quality, audio {}",
            after.speed,
            after.quality,
            if after.remove_audio { "removed" } else { "kept" }
        ));
    }

    if after.result_url != before.result_url {
        if let Some(url) = &after.result_url {
            lines.push(format!("Timelapse ready: {url}"));
        }
    }

    // Saved and failed downloads arrive as notices.
    if after.download != before.download && after.download == Some(DownloadState::InProgress) {
        lines.push("Downloading result...".to_string());
    }

    if after.notice != before.notice {
        if let Some(notice) = &after.notice {
            let prefix = match notice.level {
                NoticeLevel::Info => "note",
                NoticeLevel::Error => "error",
            };
            lines.push(format!("{prefix}: {}", notice.text));
        }
    }

    lines
}
