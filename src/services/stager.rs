use std::path::{Path, PathBuf};

use hound::SampleFormat;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::request::{AudioSource, TimeWindow};

/// Lifecycle of a staged artifact within a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaLifecycle {
    Created,
    Trimmed,
    Sent,
    Deleted,
}

/// Pipeline-owned temporary audio artifact.
///
/// Exactly one terminal transition to `Deleted` happens per request: the
/// pipeline calls [`StagedMedia::release`] on its exit path, and `Drop`
/// backstops cancellation (a caller disconnecting mid-pipeline drops the
/// future, and with it the staged files).
#[derive(Debug)]
pub struct StagedMedia {
    original: Option<PathBuf>,
    trimmed: Option<PathBuf>,
    state: MediaLifecycle,
}

impl StagedMedia {
    /// A remote source that was never materialized locally
    fn external() -> Self {
        Self {
            original: None,
            trimmed: None,
            state: MediaLifecycle::Created,
        }
    }

    pub fn state(&self) -> MediaLifecycle {
        self.state
    }

    /// Path of the artifact to send to inference, if one exists locally.
    /// Never returns a path once the media has been deleted.
    pub fn artifact_path(&self) -> Option<&Path> {
        if self.state == MediaLifecycle::Deleted {
            return None;
        }
        self.trimmed.as_deref().or(self.original.as_deref())
    }

    /// Marks the artifact as handed off to the inference service
    pub fn mark_sent(&mut self) {
        if self.state != MediaLifecycle::Deleted {
            self.state = MediaLifecycle::Sent;
        }
    }

    /// Removes the original upload and any trimmed derivative from storage.
    ///
    /// Idempotent: only the first call deletes anything. Removal failures
    /// are logged, not propagated, so no error path can skip the transition.
    pub fn release(&mut self) {
        if self.state == MediaLifecycle::Deleted {
            return;
        }
        for path in [self.trimmed.take(), self.original.take()].into_iter().flatten() {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed staged artifact"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged artifact")
                }
            }
        }
        self.state = MediaLifecycle::Deleted;
    }
}

impl Drop for StagedMedia {
    fn drop(&mut self) {
        if self.state != MediaLifecycle::Deleted {
            tracing::debug!("Staged media dropped before release, cleaning up");
            self.release();
        }
    }
}

/// Stages uploaded audio for inference: writes the upload under the media
/// directory, trims it to the requested window, and owns cleanup of both
/// files through [`StagedMedia`].
#[derive(Debug, Clone)]
pub struct MediaStager {
    media_dir: PathBuf,
    max_trim_sec: f64,
}

impl MediaStager {
    pub fn new(media_dir: PathBuf, max_trim_sec: f64) -> Self {
        Self {
            media_dir,
            max_trim_sec,
        }
    }

    /// Produces a staged artifact covering `[window.start_sec, window.end_sec)`.
    ///
    /// Remote sources pass through untouched; the inference service performs
    /// its own fetch. The window is checked before any filesystem access, and
    /// a failed trim still deletes the original upload.
    pub fn stage(&self, source: &AudioSource, window: TimeWindow) -> AppResult<StagedMedia> {
        if window.duration() <= 0.0 || window.duration() > self.max_trim_sec {
            return Err(AppError::Validation(format!(
                "trim window must be between 0 and {:.1} seconds, got {:.1}",
                self.max_trim_sec,
                window.duration()
            )));
        }

        let (file_name, data) = match source {
            AudioSource::Remote { .. } => return Ok(StagedMedia::external()),
            AudioSource::Upload { file_name, data } => (file_name, data),
        };

        std::fs::create_dir_all(&self.media_dir).map_err(|e| {
            AppError::MediaProcessing(format!("failed to create media directory: {}", e))
        })?;

        let original = self.media_dir.join(format!("{}.wav", Uuid::new_v4()));
        std::fs::write(&original, data).map_err(|e| {
            AppError::MediaProcessing(format!("failed to store upload '{}': {}", file_name, e))
        })?;

        let mut staged = StagedMedia {
            original: Some(original.clone()),
            trimmed: None,
            state: MediaLifecycle::Created,
        };

        match self.trim(&original, window) {
            Ok(trimmed) => {
                tracing::info!(
                    upload = %file_name,
                    trimmed = %trimmed.display(),
                    duration_sec = window.duration(),
                    "Staged uploaded audio"
                );
                staged.trimmed = Some(trimmed);
                staged.state = MediaLifecycle::Trimmed;
                Ok(staged)
            }
            Err(e) => {
                // trim failed: the original upload must not linger
                staged.release();
                Err(e)
            }
        }
    }

    /// Copies the sample frames inside the window into a new WAV file
    fn trim(&self, input: &Path, window: TimeWindow) -> AppResult<PathBuf> {
        let mut reader = hound::WavReader::open(input)
            .map_err(|e| AppError::MediaProcessing(format!("failed to read WAV upload: {}", e)))?;
        let spec = reader.spec();
        let total_frames = reader.duration();

        let start_frame = (window.start_sec * spec.sample_rate as f64) as u32;
        let end_frame = ((window.end_sec * spec.sample_rate as f64) as u32).min(total_frames);
        if start_frame >= total_frames {
            return Err(AppError::MediaProcessing(format!(
                "window starts at {:.1}s but the clip is only {:.1}s long",
                window.start_sec,
                total_frames as f64 / spec.sample_rate as f64
            )));
        }

        reader
            .seek(start_frame)
            .map_err(|e| AppError::MediaProcessing(format!("failed to seek WAV upload: {}", e)))?;

        let output = self.media_dir.join(format!("{}.wav", Uuid::new_v4()));
        let mut writer = hound::WavWriter::create(&output, spec).map_err(|e| {
            AppError::MediaProcessing(format!("failed to create trimmed artifact: {}", e))
        })?;

        let frames = (end_frame - start_frame) as usize;
        let sample_count = frames * spec.channels as usize;
        let copy_error =
            |e| AppError::MediaProcessing(format!("failed to copy WAV samples: {}", e));

        match spec.sample_format {
            SampleFormat::Int => {
                for sample in reader.samples::<i32>().take(sample_count) {
                    writer
                        .write_sample(sample.map_err(copy_error)?)
                        .map_err(copy_error)?;
                }
            }
            SampleFormat::Float => {
                for sample in reader.samples::<f32>().take(sample_count) {
                    writer
                        .write_sample(sample.map_err(copy_error)?)
                        .map_err(copy_error)?;
                }
            }
        }

        writer.finalize().map_err(|e| {
            AppError::MediaProcessing(format!("failed to finalize trimmed artifact: {}", e))
        })?;

        Ok(output)
    }
}
