use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use timelapse_logging::{tl_debug, tl_info, tl_warn};
use tokio_util::sync::CancellationToken;

use crate::download::{download_result, DownloadSettings};
use crate::preview::PreviewRegistry;
use crate::ticker::{spawn_ticker, ChannelEventSink, EventSink, TickerGuard, TickerSettings};
use crate::upload::{ReqwestUploader, UploadSettings, Uploader};
use crate::{EngineEvent, PreviewKey, SubmissionId, UploadForm};

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub upload: UploadSettings,
    pub ticker: TickerSettings,
    pub download: DownloadSettings,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to spawn engine thread: {0}")]
    Thread(std::io::Error),
}

enum EngineCommand {
    Submit {
        submission: SubmissionId,
        form: UploadForm,
    },
    Cancel {
        submission: SubmissionId,
    },
    StartProgress {
        submission: SubmissionId,
    },
    StopProgress {
        submission: SubmissionId,
    },
    OpenPreview {
        preview: PreviewKey,
        path: PathBuf,
    },
    ReleasePreview {
        preview: PreviewKey,
    },
    Download {
        url: String,
    },
    CancelDownload {
        url: String,
    },
}

/// Front door to the IO side. Commands are executed in order on the engine
/// thread; results come back as `EngineEvent`s.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
    previews: Arc<PreviewRegistry>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let uploader = Arc::new(ReqwestUploader::new(config.upload.clone()));
        Self::with_uploader(config, uploader)
    }

    pub fn with_uploader(
        config: EngineConfig,
        uploader: Arc<dyn Uploader>,
    ) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let previews = Arc::new(PreviewRegistry::new());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("timelapse-io")
            .enable_all()
            .build()?;
        let worker = EngineWorker {
            config,
            uploader,
            sink: Arc::new(ChannelEventSink::new(event_tx)),
            previews: previews.clone(),
            shutdown: CancellationToken::new(),
            uploads: Arc::new(Mutex::new(HashMap::new())),
            downloads: Arc::new(Mutex::new(HashMap::new())),
            download_generation: 0,
            tickers: HashMap::new(),
        };
        thread::Builder::new()
            .name("timelapse-engine".to_string())
            .spawn(move || worker.run(runtime, cmd_rx))
            .map_err(EngineError::Thread)?;

        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
            previews,
        })
    }

    pub fn submit(&self, submission: SubmissionId, form: UploadForm) {
        self.send(EngineCommand::Submit { submission, form });
    }

    /// Aborts the upload; no completion event is emitted for it afterwards.
    pub fn cancel(&self, submission: SubmissionId) {
        self.send(EngineCommand::Cancel { submission });
    }

    pub fn start_progress(&self, submission: SubmissionId) {
        self.send(EngineCommand::StartProgress { submission });
    }

    pub fn stop_progress(&self, submission: SubmissionId) {
        self.send(EngineCommand::StopProgress { submission });
    }

    pub fn open_preview(&self, preview: PreviewKey, path: PathBuf) {
        self.send(EngineCommand::OpenPreview { preview, path });
    }

    pub fn release_preview(&self, preview: PreviewKey) {
        self.send(EngineCommand::ReleasePreview { preview });
    }

    pub fn download(&self, url: impl Into<String>) {
        self.send(EngineCommand::Download { url: url.into() });
    }

    /// Stops a running download; no completion event is emitted for it afterwards.
    pub fn cancel_download(&self, url: impl Into<String>) {
        self.send(EngineCommand::CancelDownload { url: url.into() });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }

    /// Waits for the next event. `Disconnected` means the engine thread is gone
    /// and no further events will arrive.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        self.event_rx
            .lock()
            .map_err(|_| RecvTimeoutError::Disconnected)?
            .recv_timeout(timeout)
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            tl_warn!("Engine thread is gone; command dropped");
        }
    }
}

type UploadTokens = Arc<Mutex<HashMap<SubmissionId, CancellationToken>>>;
/// Running downloads by url, tagged with a generation so a finished task only
/// removes its own entry.
type DownloadTokens = Arc<Mutex<HashMap<String, (u64, CancellationToken)>>>;

struct EngineWorker {
    config: EngineConfig,
    uploader: Arc<dyn Uploader>,
    sink: Arc<dyn EventSink>,
    previews: Arc<PreviewRegistry>,
    shutdown: CancellationToken,
    uploads: UploadTokens,
    downloads: DownloadTokens,
    download_generation: u64,
    tickers: HashMap<SubmissionId, TickerGuard>,
}

impl EngineWorker {
    fn run(mut self, runtime: tokio::runtime::Runtime, cmd_rx: mpsc::Receiver<EngineCommand>) {
        while let Ok(command) = cmd_rx.recv() {
            self.handle(runtime.handle(), command);
        }
        tl_debug!("All engine handles dropped; shutting down");
        self.shutdown.cancel();
        self.tickers.clear();
        runtime.shutdown_timeout(Duration::from_secs(1));
    }

    fn handle(&mut self, runtime: &tokio::runtime::Handle, command: EngineCommand) {
        match command {
            EngineCommand::Submit { submission, form } => {
                let token = self.shutdown.child_token();
                let previous = lock(&self.uploads).insert(submission, token.clone());
                if let Some(previous) = previous {
                    previous.cancel();
                }
                let uploader = self.uploader.clone();
                let sink = self.sink.clone();
                let uploads = self.uploads.clone();
                runtime.spawn(async move {
                    let result = uploader.upload(&form, &token).await;
                    lock(&uploads).remove(&submission);
                    if token.is_cancelled() {
                        tl_info!("Discarding result of cancelled submission {}", submission);
                        return;
                    }
                    sink.emit(EngineEvent::SubmissionCompleted { submission, result });
                });
            }
            EngineCommand::Cancel { submission } => {
                let token = lock(&self.uploads).remove(&submission);
                match token {
                    Some(token) => {
                        tl_info!("Cancelling submission {}", submission);
                        token.cancel();
                    }
                    None => tl_debug!("Cancel for finished submission {}", submission),
                }
            }
            EngineCommand::StartProgress { submission } => {
                let guard = spawn_ticker(runtime, submission, self.config.ticker, self.sink.clone());
                // Replacing an existing guard drops it, which stops that ticker.
                self.tickers.insert(submission, guard);
            }
            EngineCommand::StopProgress { submission } => {
                self.tickers.remove(&submission);
            }
            EngineCommand::OpenPreview { preview, path } => {
                let result = self
                    .previews
                    .open(preview, &path)
                    .map_err(|err| format!("{}: {err}", path.display()));
                self.sink.emit(EngineEvent::PreviewOpened { preview, result });
            }
            EngineCommand::ReleasePreview { preview } => {
                if !self.previews.release(preview) {
                    tl_debug!("Preview {} was not open", preview);
                }
            }
            EngineCommand::Download { url } => {
                let settings: DownloadSettings = self.config.download.clone();
                let token = self.shutdown.child_token();
                self.download_generation += 1;
                let generation = self.download_generation;
                let previous =
                    lock(&self.downloads).insert(url.clone(), (generation, token.clone()));
                if let Some((_, previous)) = previous {
                    previous.cancel();
                }
                let sink = self.sink.clone();
                let downloads = self.downloads.clone();
                runtime.spawn(async move {
                    let result = download_result(&url, &settings, &token)
                        .await
                        .map_err(|err| err.to_string());
                    {
                        let mut running = lock(&downloads);
                        if running.get(&url).is_some_and(|(current, _)| *current == generation) {
                            running.remove(&url);
                        }
                    }
                    if token.is_cancelled() {
                        tl_info!("Discarding cancelled download of {}", url);
                        return;
                    }
                    sink.emit(EngineEvent::DownloadCompleted { url, result });
                });
            }
            EngineCommand::CancelDownload { url } => {
                let token = lock(&self.downloads).remove(&url);
                match token {
                    Some((_, token)) => {
                        tl_info!("Cancelling download of {}", url);
                        token.cancel();
                    }
                    None => tl_debug!("Cancel for finished download {}", url),
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
