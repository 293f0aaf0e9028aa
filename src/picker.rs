use chrono::Local;
use photo_finisher::{DeviceInfo, PhotoFinisher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

use crate::config::PickerConfig;
use crate::error::MediaError;
use crate::filesystem::{
    file_name_forcing_extension, file_name_with_extension, resolve_directory, sanitize_component,
    timestamped_name, unique_path,
};
use crate::media_file::MediaFile;
use crate::options::{MediaKind, PickMediaOptions, StoreCameraMediaOptions, VideoOptions};
use crate::platform::{
    default_backend, Capabilities, CaptureRequest, PickerBackend, VideoRequest,
};
use crate::session::{OperationSlot, SlotGuard};

/// The operation currently owning a `MediaPicker`
///
/// Await `outcome()` for the result; `cancel()` dismisses the native UI if it
/// is still showing.
#[derive(Debug)]
pub struct MediaOperation<T> {
    id: Ulid,
    kind: MediaKind,
    cancel: CancellationToken,
    handle: JoinHandle<Result<T, MediaError>>,
}

impl<T> MediaOperation<T> {
    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn cancel(&self) {
        log::debug!("Cancel requested for {} operation {}", self.kind, self.id);
        self.cancel.cancel();
    }

    /// A clone of the token, for cancelling from elsewhere.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn outcome(self) -> Result<T, MediaError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(MediaError::Platform(format!(
                "{} operation {} aborted: {}",
                self.kind, self.id, e
            ))),
        }
    }
}

struct PickerInner {
    config: PickerConfig,
    backend: Arc<dyn PickerBackend>,
    finisher: PhotoFinisher,
    slot: OperationSlot,
}

/// Entry point: take or pick photos and videos through the platform picker
///
/// One operation runs at a time; starting another while one is active fails
/// with `MediaError::ConcurrentOperation`. The `start_*` methods must be
/// called from within a tokio runtime.
#[derive(Clone)]
pub struct MediaPicker {
    inner: Arc<PickerInner>,
}

impl std::fmt::Debug for MediaPicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPicker")
            .field("backend", &self.inner.backend.name())
            .field("busy", &self.inner.slot.is_busy())
            .finish()
    }
}

impl MediaPicker {
    pub fn new(config: PickerConfig) -> Self {
        let backend = default_backend(&config);
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: PickerConfig, backend: Arc<dyn PickerBackend>) -> Self {
        let finisher = PhotoFinisher::new(config.finisher.clone());
        log::info!("Media picker using {} backend", backend.name());
        Self {
            inner: Arc::new(PickerInner {
                config,
                backend,
                finisher,
                slot: OperationSlot::default(),
            }),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner.backend.capabilities()
    }

    pub fn is_camera_available(&self) -> bool {
        self.capabilities().camera_available
    }

    pub fn is_take_photo_supported(&self) -> bool {
        self.capabilities().take_photo
    }

    pub fn is_pick_photo_supported(&self) -> bool {
        self.capabilities().pick_photo
    }

    pub fn is_take_video_supported(&self) -> bool {
        self.capabilities().take_video
    }

    pub fn is_pick_video_supported(&self) -> bool {
        self.capabilities().pick_video
    }

    /// Whether an operation currently holds the picker.
    pub fn is_busy(&self) -> bool {
        self.inner.slot.is_busy()
    }

    fn start<T, F>(&self, kind: MediaKind, run: F) -> Result<MediaOperation<T>, MediaError>
    where
        T: Send + 'static,
        F: FnOnce(&PickerInner, &CancellationToken) -> Result<T, MediaError> + Send + 'static,
    {
        let guard: SlotGuard = self.inner.slot.try_claim(kind)?;
        let id = guard.id();
        let cancel = CancellationToken::new();

        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let result = run(&inner, &token);
            match &result {
                Ok(_) => log::debug!("{} operation {} done", kind, id),
                Err(MediaError::Canceled) => log::info!("{} operation {} canceled", kind, id),
                Err(e) => log::error!("{} operation {} failed: {}", kind, id, e),
            }
            result
        });

        log::debug!("Started {} operation {}", kind, id);
        Ok(MediaOperation {
            id,
            kind,
            cancel,
            handle,
        })
    }

    fn require(&self, supported: bool, what: &str) -> Result<(), MediaError> {
        if supported {
            Ok(())
        } else {
            Err(MediaError::PlatformNotSupported(format!(
                "{} not supported by the {} backend",
                what,
                self.inner.backend.name()
            )))
        }
    }

    /// Opens the camera. Resolves to `None` if the user backs out.
    pub fn start_take_photo(
        &self,
        options: StoreCameraMediaOptions,
    ) -> Result<MediaOperation<Option<MediaFile>>, MediaError> {
        self.require(self.is_take_photo_supported(), "Taking photos")?;
        self.start(MediaKind::Photo, move |inner, cancel| {
            inner.take_photo(&options, cancel)
        })
    }

    pub fn start_pick_photo(
        &self,
        options: PickMediaOptions,
    ) -> Result<MediaOperation<Option<MediaFile>>, MediaError> {
        self.require(self.is_pick_photo_supported(), "Picking photos")?;
        self.start(MediaKind::Photo, move |inner, cancel| {
            inner.pick_photo(&options, cancel)
        })
    }

    /// Multi-select. Resolves to an empty list if the user backs out.
    pub fn start_pick_photos(
        &self,
        options: PickMediaOptions,
    ) -> Result<MediaOperation<Vec<MediaFile>>, MediaError> {
        self.require(self.is_pick_photo_supported(), "Picking photos")?;
        self.start(MediaKind::Photo, move |inner, cancel| {
            inner.pick_photos(&options, cancel)
        })
    }

    pub fn start_take_video(
        &self,
        options: VideoOptions,
    ) -> Result<MediaOperation<Option<MediaFile>>, MediaError> {
        self.require(self.is_take_video_supported(), "Recording video")?;
        self.start(MediaKind::Video, move |inner, cancel| {
            inner.take_video(&options, cancel)
        })
    }

    pub fn start_pick_video(&self) -> Result<MediaOperation<Option<MediaFile>>, MediaError> {
        self.require(self.is_pick_video_supported(), "Picking videos")?;
        self.start(MediaKind::Video, |inner, cancel| inner.pick_video(cancel))
    }

    pub async fn take_photo(
        &self,
        options: StoreCameraMediaOptions,
    ) -> Result<Option<MediaFile>, MediaError> {
        self.start_take_photo(options)?.outcome().await
    }

    pub async fn pick_photo(&self, options: PickMediaOptions) -> Result<Option<MediaFile>, MediaError> {
        self.start_pick_photo(options)?.outcome().await
    }

    pub async fn pick_photos(&self, options: PickMediaOptions) -> Result<Vec<MediaFile>, MediaError> {
        self.start_pick_photos(options)?.outcome().await
    }

    pub async fn take_video(&self, options: VideoOptions) -> Result<Option<MediaFile>, MediaError> {
        self.start_take_video(options)?.outcome().await
    }

    pub async fn pick_video(&self) -> Result<Option<MediaFile>, MediaError> {
        self.start_pick_video()?.outcome().await
    }
}

impl PickerInner {
    fn prepare_dir(&self, directory: Option<&str>) -> Result<PathBuf, MediaError> {
        let dir = resolve_directory(&self.config.working_dir(), directory);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        self.backend
            .device_info()
            .or_else(|| self.config.device.clone())
    }

    fn save_to_album(&self, path: &Path, kind: MediaKind) -> Option<PathBuf> {
        match self.backend.save_to_album(path, kind) {
            Ok(album_path) => {
                log::info!("Saved {} to album as {:?}", kind, album_path);
                Some(album_path)
            }
            Err(e) => {
                log::warn!("Could not save {:?} to album: {}", path, e);
                None
            }
        }
    }

    fn take_photo(
        &self,
        options: &StoreCameraMediaOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaFile>, MediaError> {
        let dir = self.prepare_dir(options.directory.as_deref())?;
        let name = match &options.name {
            Some(name) => file_name_forcing_extension(name, "jpg"),
            None => timestamped_name("IMG", Local::now(), "jpg"),
        };
        let request = CaptureRequest {
            target: unique_path(&dir, &name),
            camera: options.camera,
        };

        let Some(path) = self.backend.capture_photo(&request, cancel)?.into_result()? else {
            return Ok(None);
        };
        if cancel.is_cancelled() {
            log::info!("Canceled after capture, leaving {:?} unprocessed", path);
            return Err(MediaError::Canceled);
        }

        let mut finish = options.finish_options();
        finish.device = self.device_info();
        finish.captured_at = Some(Local::now().naive_local());
        self.finisher.finish(&path, &finish)?;

        let album_path = if options.save_to_album {
            self.save_to_album(&path, MediaKind::Photo)
        } else {
            None
        };
        Ok(Some(MediaFile::new(path, album_path, MediaKind::Photo)))
    }

    /// Gallery files belong to the gallery: anything that needs finishing is
    /// copied into the working directory first.
    fn finish_picked(&self, source: PathBuf, options: &PickMediaOptions) -> Result<MediaFile, MediaError> {
        let finish = options.finish_options();
        if !self.finisher.needs_processing(&source, &finish)? {
            return Ok(MediaFile::new(source, None, MediaKind::Photo));
        }

        let stem = source
            .file_stem()
            .map(|s| sanitize_component(&s.to_string_lossy()))
            .unwrap_or_else(|| "picked".to_string());
        let copy = unique_path(&self.prepare_dir(None)?, &format!("{}.jpg", stem));
        std::fs::copy(&source, &copy).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MediaError::NotFound(source.clone()),
            _ => MediaError::Io(e),
        })?;
        log::debug!("Working on copy {:?} of {:?}", copy, source);

        if let Err(e) = self.finisher.finish(&copy, &finish) {
            if let Err(rm) = std::fs::remove_file(&copy) {
                log::warn!("Could not remove working copy {:?}: {}", copy, rm);
            }
            return Err(e.into());
        }
        Ok(MediaFile::new(copy, None, MediaKind::Photo))
    }

    fn pick_photo(
        &self,
        options: &PickMediaOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaFile>, MediaError> {
        let Some(source) = self.backend.pick_photo(cancel)?.into_result()? else {
            return Ok(None);
        };
        if cancel.is_cancelled() {
            return Err(MediaError::Canceled);
        }
        self.finish_picked(source, options).map(Some)
    }

    fn pick_photos(
        &self,
        options: &PickMediaOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaFile>, MediaError> {
        let sources = self
            .backend
            .pick_photos(cancel)?
            .into_result()?
            .unwrap_or_default();

        let mut files = Vec::with_capacity(sources.len());
        for source in sources {
            if cancel.is_cancelled() {
                return Err(MediaError::Canceled);
            }
            files.push(self.finish_picked(source, options)?);
        }
        Ok(files)
    }

    fn take_video(
        &self,
        options: &VideoOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<MediaFile>, MediaError> {
        let dir = self.prepare_dir(options.directory.as_deref())?;
        let name = match &options.name {
            Some(name) => file_name_with_extension(name, "mp4"),
            None => timestamped_name("VID", Local::now(), "mp4"),
        };
        let request = VideoRequest {
            target: unique_path(&dir, &name),
            camera: options.camera,
            quality: options.quality,
            max_duration: options.desired_length,
            max_size_bytes: options.desired_size,
        };

        let Some(path) = self.backend.capture_video(&request, cancel)?.into_result()? else {
            return Ok(None);
        };
        let album_path = if options.save_to_album {
            self.save_to_album(&path, MediaKind::Video)
        } else {
            None
        };
        Ok(Some(MediaFile::new(path, album_path, MediaKind::Video)))
    }

    fn pick_video(&self, cancel: &CancellationToken) -> Result<Option<MediaFile>, MediaError> {
        Ok(self
            .backend
            .pick_video(cancel)?
            .into_result()?
            .map(|path| MediaFile::new(path, None, MediaKind::Video)))
    }
}
