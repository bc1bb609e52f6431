use std::fs;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use timelapse_core::{update, AppState, DownloadState, Msg, SelectedFile, SubmissionState};
use timelapse_engine::{
    check_health, DownloadSettings, EngineConfig, EngineHandle, UploadSettings,
};
use timelapse_logging::{tl_info, tl_warn};

use crate::cli::{HealthArgs, ProcessArgs};
use crate::effects::EffectRunner;
use crate::render::Renderer;
use crate::settings::{load_settings, resolve, save_settings, Overrides, SavedSettings};

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Uploads one video and waits for the result. Returns whether it succeeded.
pub fn run_process(args: ProcessArgs) -> anyhow::Result<bool> {
    let saved = load_settings(&args.output);
    let resolved = resolve(
        &saved,
        &Overrides {
            endpoint: args.endpoint.as_deref(),
            speed: args.speed,
            quality: args.quality,
            keep_audio: args.keep_audio,
        },
    );

    let metadata = fs::metadata(&args.video)
        .with_context(|| format!("cannot read {}", args.video.display()))?;
    anyhow::ensure!(metadata.is_file(), "{} is not a file", args.video.display());

    let config = EngineConfig {
        upload: UploadSettings {
            endpoint: resolved.endpoint.clone(),
            ..UploadSettings::default()
        },
        download: DownloadSettings {
            output_dir: args.output.clone(),
            ..DownloadSettings::default()
        },
        ..EngineConfig::default()
    };
    let engine = EngineHandle::new(config).context("failed to start the engine")?;

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let mut session = Session {
        state: AppState::new().with_options(resolved.options),
        runner: EffectRunner::new(engine, msg_tx.clone()),
        renderer: Renderer::new(),
        download_requested: false,
    };

    spawn_tick(msg_tx.clone());
    spawn_interrupt_listener(msg_tx);

    session.dispatch(Msg::FileSelected(Some(SelectedFile::new(
        args.video.clone(),
        metadata.len(),
    ))));
    if session.state.selection().is_none() {
        // Rejected; the notice has been rendered.
        return Ok(false);
    }

    session.dispatch(Msg::SubmitClicked);
    if session.state.is_submitting() && !args.no_save_settings {
        match save_settings(&args.output, &SavedSettings::remember(&resolved)) {
            Ok(path) => tl_info!("Settings saved to {:?}", path),
            Err(err) => tl_warn!("Could not save settings: {}", err),
        }
    }

    while let Ok(msg) = msg_rx.recv() {
        session.dispatch(msg);
        match session.outcome(args.download) {
            Some(Finished::Succeeded) => return Ok(true),
            Some(Finished::Failed) => return Ok(false),
            Some(Finished::Cancelled) => {
                eprintln!("Cancelled.");
                return Ok(false);
            }
            None => {}
        }
    }
    Ok(false)
}

/// Checks the service health route. Returns whether it reported healthy.
pub fn run_health(args: HealthArgs) -> anyhow::Result<bool> {
    let saved = load_settings(&args.output);
    let resolved = resolve(
        &saved,
        &Overrides {
            endpoint: args.endpoint.as_deref(),
            ..Overrides::default()
        },
    );
    let settings = UploadSettings {
        endpoint: resolved.endpoint,
        ..UploadSettings::default()
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    match runtime.block_on(check_health(&settings)) {
        Ok(health) => {
            println!(
                "{}: status {}, ffmpeg {}",
                settings.endpoint,
                health.status,
                if health.ffmpeg_available {
                    "available"
                } else {
                    "missing"
                }
            );
            Ok(health.is_healthy())
        }
        Err(err) => {
            println!("{}: {}", settings.endpoint, err);
            Ok(false)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finished {
    Succeeded,
    Failed,
    Cancelled,
}

struct Session {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
    download_requested: bool,
}

impl Session {
    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        self.runner.enqueue(effects);
        if state.consume_dirty() {
            self.renderer.render(&state.view());
        }
        self.state = state;
    }

    /// Decides whether the run is over, asking for the download first when wanted.
    fn outcome(&mut self, download: bool) -> Option<Finished> {
        let request_download = download
            && !self.download_requested
            && matches!(
                self.state.submission(),
                SubmissionState::Succeeded {
                    download: DownloadState::NotRequested,
                    ..
                }
            );
        if request_download {
            self.download_requested = true;
            self.dispatch(Msg::DownloadClicked);
            return None;
        }

        match self.state.submission() {
            SubmissionState::InFlight { .. } => None,
            SubmissionState::Failed { .. } => Some(Finished::Failed),
            // Reset while in flight.
            SubmissionState::Idle => Some(Finished::Cancelled),
            SubmissionState::Succeeded { .. } if !download => Some(Finished::Succeeded),
            SubmissionState::Succeeded { download, .. } => match download {
                DownloadState::Saved(_) => Some(Finished::Succeeded),
                DownloadState::Failed(_) => Some(Finished::Failed),
                DownloadState::NotRequested | DownloadState::InProgress => None,
            },
        }
    }
}

/// Wakes the loop regularly so redraws are not tied to engine traffic.
fn spawn_tick(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        while msg_tx.send(Msg::Tick).is_ok() {
            thread::sleep(TICK_INTERVAL);
        }
    });
}

/// Ctrl-C resets the form, which cancels the outstanding upload.
fn spawn_interrupt_listener(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tl_warn!("Ctrl-C handling unavailable: {}", err);
                return;
            }
        };
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tl_info!("Interrupted; cancelling");
                let _ = msg_tx.send(Msg::ResetClicked);
            }
        });
    });
}
