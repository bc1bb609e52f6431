use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use timelapse_core::{
    Effect, FailureKind, Msg, PreviewId, ResultResource, SubmissionFailure, UploadRequest,
};
use timelapse_engine::{EngineEvent, EngineHandle, UploadError, UploadForm, UploadOutcome};
use timelapse_logging::{tl_debug, tl_info, tl_warn};

const EVENT_POLL: Duration = Duration::from_millis(50);

/// Turns effects from the state machine into engine commands.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, msg_tx: mpsc::Sender<Msg>) -> Self {
        let runner = Self { engine };
        runner.spawn_event_loop(msg_tx);
        runner
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::OpenFilePicker => {
                    // The video comes from the command line.
                    tl_debug!("File picker requested; nothing to open in the terminal");
                }
                Effect::OpenPreview { preview, path } => {
                    self.engine.open_preview(preview.0, path);
                }
                Effect::ReleasePreview { preview } => {
                    self.engine.release_preview(preview.0);
                }
                Effect::StartProgress { submission } => {
                    self.engine.start_progress(submission);
                }
                Effect::StopProgress { submission } => {
                    self.engine.stop_progress(submission);
                }
                Effect::Submit {
                    submission,
                    request,
                } => {
                    tl_info!(
                        "Submit submission={} file={} speed={} quality={} remove_audio={}",
                        submission,
                        request.file_name,
                        request.options.speed,
                        request.options.quality,
                        request.options.remove_audio
                    );
                    self.engine.submit(submission, to_form(request));
                }
                Effect::CancelSubmission { submission } => {
                    self.engine.cancel(submission);
                }
                Effect::DownloadResult { url } => {
                    self.engine.download(url.as_str());
                }
                Effect::CancelDownload { url } => {
                    self.engine.cancel_download(url.as_str());
                }
            }
        }
    }

    fn spawn_event_loop(&self, msg_tx: mpsc::Sender<Msg>) {
        let engine = self.engine.clone();
        thread::spawn(move || pump_events(|| engine.recv_timeout(EVENT_POLL), &msg_tx));
    }
}

/// Forwards engine events as messages until either side goes away.
fn pump_events(
    mut next: impl FnMut() -> Result<EngineEvent, RecvTimeoutError>,
    msg_tx: &mpsc::Sender<Msg>,
) {
    loop {
        let event = match next() {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                tl_warn!("Engine event channel closed");
                return;
            }
        };
        if let Some(msg) = map_event(event) {
            if msg_tx.send(msg).is_err() {
                return;
            }
        }
    }
}

fn to_form(request: UploadRequest) -> UploadForm {
    UploadForm {
        video_path: request.path,
        file_name: request.file_name,
        mime_type: request.mime_type.to_string(),
        speed: request.options.speed.get(),
        quality: request.options.quality.as_str().to_string(),
        remove_audio: request.options.remove_audio,
    }
}

fn map_event(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::ProgressTick {
            submission,
            increment,
        } => Some(Msg::ProgressTick {
            submission,
            increment,
        }),
        EngineEvent::SubmissionCompleted { submission, result } => {
            Some(Msg::SubmissionCompleted {
                submission,
                outcome: map_outcome(result),
            })
        }
        EngineEvent::PreviewOpened { preview, result } => match result {
            Ok(info) => Some(Msg::PreviewLoaded {
                preview: PreviewId(preview),
                summary: info.summary(),
            }),
            Err(err) => {
                tl_warn!("Preview {} could not be opened: {}", preview, err);
                None
            }
        },
        EngineEvent::DownloadCompleted { url, result } => match ResultResource::parse(&url) {
            Ok(url) => Some(Msg::DownloadFinished { url, result }),
            Err(err) => {
                tl_warn!("Download finished for unusable url {}: {}", url, err);
                None
            }
        },
    }
}

fn map_outcome(
    result: Result<UploadOutcome, UploadError>,
) -> Result<ResultResource, SubmissionFailure> {
    match result {
        Ok(outcome) => {
            if let Some(message) = outcome.message.as_deref() {
                tl_info!("Service: {}", message);
            }
            ResultResource::parse(&outcome.download_url).map_err(|err| {
                SubmissionFailure::new(FailureKind::MalformedResponse, err.to_string())
            })
        }
        Err(err) => {
            tl_warn!("Upload failed: {}", err);
            Err(map_failure(err))
        }
    }
}

fn map_failure(err: UploadError) -> SubmissionFailure {
    use timelapse_engine::FailureKind as Engine;

    let kind = match err.kind {
        Engine::InvalidEndpoint => FailureKind::InvalidEndpoint,
        Engine::InvalidRequest => FailureKind::InvalidRequest,
        Engine::FileUnreadable => FailureKind::FileUnreadable,
        Engine::HttpStatus {
            status,
            server_message,
        } => FailureKind::Server {
            status,
            message: server_message,
        },
        Engine::MalformedResponse => FailureKind::MalformedResponse,
        Engine::Timeout => FailureKind::Timeout,
        Engine::Cancelled => FailureKind::Cancelled,
        Engine::Network => FailureKind::Network,
    };
    SubmissionFailure::new(kind, err.message)
}
