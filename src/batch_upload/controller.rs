use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::batch_upload::dimensions::read_dimensions;
use crate::batch_upload::uploader::Uploader;
use crate::batch_upload::{
    BatchRejection, BatchUploadOptions, FileRejection, ImageInfo, Notice, PreviewHandle,
    SelectedFile, UploadEvent, UploadStatus, UploadedImage,
};

#[derive(Default)]
struct QueueState {
    images: Vec<UploadedImage>,
    committed: Vec<ImageInfo>,
    live_previews: HashSet<PreviewHandle>,
}

impl QueueState {
    fn image_mut(&mut self, id: &str) -> Option<&mut UploadedImage> {
        self.images.iter_mut().find(|image| image.id == id)
    }

    /// Appends unless the key is already committed. Returns whether the list changed.
    fn commit(&mut self, info: ImageInfo) -> bool {
        if self.committed.iter().any(|existing| existing.key == info.key) {
            return false;
        }
        self.committed.push(info);
        true
    }

    fn uncommit(&mut self, key: &str) -> bool {
        let before = self.committed.len();
        self.committed.retain(|info| info.key != key);
        self.committed.len() != before
    }
}

/// Files accepted into the queue and files turned away, for one call to
/// [`BatchUploadController::add_files`].
#[derive(Debug, Default)]
pub struct AddOutcome {
    pub accepted: Vec<String>,
    pub rejected: Vec<FileRejection>,
}

/// Queue of in-flight image uploads plus the list of committed results.
///
/// Every upload runs on its own task; the caller observes progress through the
/// event receiver returned by [`BatchUploadController::new`] or by polling
/// [`images`](Self::images) and [`committed`](Self::committed).
pub struct BatchUploadController<U: Uploader + 'static> {
    options: BatchUploadOptions,
    uploader: Arc<U>,
    state: Arc<Mutex<QueueState>>,
    events: mpsc::UnboundedSender<UploadEvent>,
    tasks: JoinSet<()>,
}

impl<U: Uploader + 'static> BatchUploadController<U> {
    /// `initial` seeds the committed list, e.g. with images an album already has.
    pub fn new(
        uploader: U,
        options: BatchUploadOptions,
        initial: Vec<ImageInfo>,
    ) -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();

        let mut state = QueueState::default();
        for info in initial {
            state.commit(info);
        }

        let controller = Self {
            options,
            uploader: Arc::new(uploader),
            state: Arc::new(Mutex::new(state)),
            events,
            tasks: JoinSet::new(),
        };

        (controller, receiver)
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        lock_state(&self.state)
    }

    fn emit(&self, event: UploadEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    /// Validates, measures and queues a selection, scheduling one upload per
    /// accepted file. Must be called from within a tokio runtime.
    pub fn add_files(&mut self, files: Vec<SelectedFile>) -> Result<AddOutcome, BatchRejection> {
        let current = self.total_count();
        if current + files.len() > self.options.max_files {
            let rejection = BatchRejection::TooManyFiles {
                max_files: self.options.max_files,
                current,
                incoming: files.len(),
            };
            log::warn!("{rejection}");
            self.emit(UploadEvent::Notice(Notice::error(rejection.to_string())));
            return Err(rejection);
        }

        let mut outcome = AddOutcome::default();

        for file in files {
            if let Err(rejection) = self.validate(&file) {
                log::info!("Skipping {}", rejection);
                self.emit(UploadEvent::Notice(Notice::error(rejection.to_string())));
                outcome.rejected.push(rejection);
                continue;
            }

            let dimensions = read_dimensions(&file.bytes);
            let id = Uuid::new_v4().to_string();
            let preview = PreviewHandle::for_image(&id);

            {
                let mut state = self.lock();
                state.live_previews.insert(preview.clone());
                state.images.push(UploadedImage {
                    id: id.clone(),
                    file: file.clone(),
                    preview,
                    status: UploadStatus::Pending,
                    progress: 0,
                    key: None,
                    width: dimensions.map(|(width, _)| width),
                    height: dimensions.map(|(_, height)| height),
                });
            }

            self.emit(UploadEvent::StatusChanged {
                id: id.clone(),
                status: UploadStatus::Pending,
            });

            self.tasks.spawn(run_upload(
                self.uploader.clone(),
                self.state.clone(),
                self.events.clone(),
                id.clone(),
                file,
                self.options.prefix.clone(),
                self.options.schedule_delay,
            ));

            outcome.accepted.push(id);
        }

        Ok(outcome)
    }

    fn validate(&self, file: &SelectedFile) -> Result<(), FileRejection> {
        if !file.content_type.starts_with("image/") {
            return Err(FileRejection::NotAnImage {
                name: file.name.clone(),
            });
        }

        if file.size() as u64 > self.options.max_file_size_bytes() {
            return Err(FileRejection::TooLarge {
                name: file.name.clone(),
                max_mb: self.options.max_file_size_mb,
            });
        }

        Ok(())
    }

    /// Drops a file from the queue. Its upload is not aborted, but the result
    /// is no longer tracked. Returns false for an unknown id.
    pub fn remove_image(&mut self, id: &str) -> bool {
        let committed = {
            let mut state = self.lock();
            let Some(index) = state.images.iter().position(|image| image.id == id) else {
                return false;
            };
            let image = state.images.remove(index);
            state.live_previews.remove(&image.preview);

            match image.key {
                Some(key) if state.uncommit(&key) => Some(state.committed.clone()),
                _ => None,
            }
        };

        if let Some(committed) = committed {
            self.emit(UploadEvent::CommittedChanged(committed));
        }
        true
    }

    /// Drops an entry from the committed list, along with any queued file that
    /// produced it.
    pub fn remove_committed(&mut self, key: &str) -> bool {
        let committed = {
            let mut state = self.lock();
            if !state.uncommit(key) {
                return false;
            }

            let removed: Vec<PreviewHandle> = state
                .images
                .iter()
                .filter(|image| image.key.as_deref() == Some(key))
                .map(|image| image.preview.clone())
                .collect();
            state.images.retain(|image| image.key.as_deref() != Some(key));
            for preview in &removed {
                state.live_previews.remove(preview);
            }

            state.committed.clone()
        };

        self.emit(UploadEvent::CommittedChanged(committed));
        true
    }

    /// Forgets every queued file and every committed image.
    pub fn clear_all(&mut self) {
        {
            let mut state = self.lock();
            state.images.clear();
            state.committed.clear();
            state.live_previews.clear();
        }
        self.emit(UploadEvent::CommittedChanged(Vec::new()));
    }

    /// Queued files plus committed images; the figure `max_files` is checked against.
    pub fn total_count(&self) -> usize {
        let state = self.lock();
        state.images.len() + state.committed.len()
    }

    pub fn is_uploading(&self) -> bool {
        self.lock()
            .images
            .iter()
            .any(|image| !image.status.is_terminal())
    }

    pub fn images(&self) -> Vec<UploadedImage> {
        self.lock().images.clone()
    }

    pub fn committed(&self) -> Vec<ImageInfo> {
        self.lock().committed.clone()
    }

    pub fn is_preview_live(&self, preview: &PreviewHandle) -> bool {
        self.lock().live_previews.contains(preview)
    }

    /// Waits for every scheduled upload to finish, successfully or not.
    pub async fn wait_idle(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                log::error!("Upload task failed to complete: {e}");
            }
        }
    }
}

fn lock_state(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_upload<U: Uploader>(
    uploader: Arc<U>,
    state: Arc<Mutex<QueueState>>,
    events: mpsc::UnboundedSender<UploadEvent>,
    id: String,
    file: SelectedFile,
    prefix: String,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;

    {
        let mut state = lock_state(&state);
        let Some(image) = state.image_mut(&id) else {
            log::debug!("{} was removed before its upload started", file.name);
            return;
        };
        if image.status != UploadStatus::Pending {
            return;
        }
        image.status = UploadStatus::Uploading;
        image.progress = 0;
    }
    let _ = events.send(UploadEvent::StatusChanged {
        id: id.clone(),
        status: UploadStatus::Uploading,
    });

    let result = uploader.upload(&file, &prefix).await;

    let mut guard = lock_state(&state);
    let Some(image) = guard.image_mut(&id) else {
        log::info!("{} finished after being removed, not committing it", file.name);
        return;
    };

    match result {
        Ok(response) => {
            image.status = UploadStatus::Success;
            image.progress = 100;
            image.key = Some(response.key.clone());
            let info = ImageInfo {
                key: response.key,
                width: image.width,
                height: image.height,
            };

            log::info!("Uploaded {} as {}", file.name, info.key);
            let changed = guard.commit(info);
            let committed = guard.committed.clone();
            drop(guard);

            let _ = events.send(UploadEvent::StatusChanged {
                id,
                status: UploadStatus::Success,
            });
            if changed {
                let _ = events.send(UploadEvent::CommittedChanged(committed));
            }
        }
        Err(e) => {
            image.status = UploadStatus::Error;
            image.progress = 0;
            drop(guard);

            log::error!("Failed to upload {}: {e}", file.name);
            let _ = events.send(UploadEvent::StatusChanged {
                id,
                status: UploadStatus::Error,
            });
            let _ = events.send(UploadEvent::Notice(Notice::error(format!(
                "{} failed to upload",
                file.name
            ))));
        }
    }
}
