//! File upload capability.
//!
//! Transport is the host's business: it plugs in an [`Uploader`]. Fields of
//! classification `file` hold a [`FileUpload`] that tracks per-file progress
//! and turns into the JSON file collection the `mime` and `required` rules
//! inspect.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, join_all};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use formkit_model::Value;

use crate::error::FormError;

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    pub name: String,
    /// Declared MIME type.
    #[serde(rename = "type")]
    pub mime: String,
    #[serde(default)]
    pub size: u64,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size,
        }
    }
}

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    pub url: String,
    pub name: String,
}

/// Upload failure reported by an [`Uploader`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UploadError {
    pub message: String,
}

impl UploadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Progress callback, called with a percentage in `0..=100`.
pub type Progress = Rc<dyn Fn(u8)>;

/// Future returned by [`Uploader::upload`].
pub type UploadFuture = LocalBoxFuture<'static, Result<UploadDescriptor, UploadError>>;

/// Upload transport.
pub trait Uploader {
    /// Upload one file, reporting progress along the way.
    fn upload(&self, file: &UploadFile, progress: Progress, options: &Value) -> UploadFuture;
}

/// Simulated uploader for tests and demos.
///
/// Sleeps `duration` split into `steps`, reporting progress after each
/// step. Files listed with [`FakeUploader::failing`] are rejected.
#[derive(Debug, Clone)]
pub struct FakeUploader {
    duration: Duration,
    steps: u32,
    base_url: String,
    failing: BTreeSet<String>,
}

impl Default for FakeUploader {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

impl FakeUploader {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            steps: 10,
            base_url: "http://localhost/uploads".to_string(),
            failing: BTreeSet::new(),
        }
    }

    /// Reject uploads of the named file.
    #[must_use]
    pub fn failing(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Uploader for FakeUploader {
    fn upload(&self, file: &UploadFile, progress: Progress, options: &Value) -> UploadFuture {
        let duration = options
            .get("duration_ms")
            .and_then(Value::as_u64)
            .map_or(self.duration, Duration::from_millis);
        let steps = self.steps.max(1);
        let step = duration / steps;
        let fail = self.failing.contains(&file.name);
        let name = file.name.clone();
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), file.name);
        async move {
            for done in 1..=steps {
                tokio::time::sleep(step).await;
                if fail && done * 2 >= steps {
                    return Err(UploadError::new("upload rejected by server"));
                }
                let percent = (done * 100 / steps).min(100) as u8;
                progress(percent);
            }
            Ok(UploadDescriptor { url, name })
        }
        .boxed_local()
    }
}

/// Upload state of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    Pending,
    Uploading,
    Complete,
    /// Finished with an error; the file will not be retried automatically.
    Failed { message: String },
}

/// One tracked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEntry {
    pub file: UploadFile,
    pub progress: u8,
    pub state: FileState,
    pub url: Option<String>,
}

impl UploadEntry {
    fn new(file: UploadFile) -> Self {
        Self {
            file,
            progress: 0,
            state: FileState::Pending,
            url: None,
        }
    }

    /// Check if the entry is finished, successfully or not.
    pub fn is_complete(&self) -> bool {
        matches!(self.state, FileState::Complete | FileState::Failed { .. })
    }
}

/// File collection handle held by a `file` field.
#[derive(Debug, Clone, Default)]
pub struct FileUpload {
    entries: Rc<RefCell<Vec<UploadEntry>>>,
}

impl FileUpload {
    pub fn new(files: impl IntoIterator<Item = UploadFile>) -> Self {
        Self {
            entries: Rc::new(RefCell::new(files.into_iter().map(UploadEntry::new).collect())),
        }
    }

    /// Rebuild a handle from a file collection value (`[{name, type, size, url?}]`).
    ///
    /// Entries that carry a `url` are already uploaded.
    pub fn from_value(value: &Value) -> Option<Self> {
        let Value::Array(items) = value else {
            return None;
        };
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let file: UploadFile = serde_json::from_value(item.clone()).ok()?;
            let mut entry = UploadEntry::new(file);
            if let Some(url) = item.get("url").and_then(Value::as_str) {
                entry.url = Some(url.to_string());
                entry.state = FileState::Complete;
                entry.progress = 100;
            }
            entries.push(entry);
        }
        Some(Self {
            entries: Rc::new(RefCell::new(entries)),
        })
    }

    pub fn entries(&self) -> Vec<UploadEntry> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Check if every file has finished.
    pub fn is_complete(&self) -> bool {
        self.entries.borrow().iter().all(UploadEntry::is_complete)
    }

    /// Upload every pending file concurrently.
    ///
    /// Resolves to the failures, one per rejected file. Failed files are
    /// marked complete-with-error rather than left pending.
    pub fn upload(
        &self,
        uploader: Rc<dyn Uploader>,
        options: Value,
    ) -> LocalBoxFuture<'static, Vec<FormError>> {
        let mut started = Vec::new();
        {
            let mut entries = self.entries.borrow_mut();
            for (index, entry) in entries.iter_mut().enumerate() {
                if entry.state != FileState::Pending {
                    continue;
                }
                entry.state = FileState::Uploading;
                let tracker = Rc::clone(&self.entries);
                let progress: Progress = Rc::new(move |percent| {
                    if let Some(entry) = tracker.borrow_mut().get_mut(index) {
                        entry.progress = percent;
                    }
                });
                started.push((index, entry.file.clone(), progress));
            }
        }

        let pending: Vec<_> = started
            .iter()
            .map(|(_, file, progress)| uploader.upload(file, Rc::clone(progress), &options))
            .collect();
        let entries = Rc::clone(&self.entries);
        async move {
            let outcomes = join_all(pending).await;
            let mut failures = Vec::new();
            let mut entries = entries.borrow_mut();
            for ((index, file, _), outcome) in started.into_iter().zip(outcomes) {
                let Some(entry) = entries.get_mut(index) else {
                    continue;
                };
                entry.progress = 100;
                match outcome {
                    Ok(descriptor) => {
                        debug!(file = %file.name, "upload complete");
                        entry.url = Some(descriptor.url);
                        entry.state = FileState::Complete;
                    }
                    Err(err) => {
                        warn!(file = %file.name, error = %err, "upload failed");
                        entry.state = FileState::Failed {
                            message: err.message.clone(),
                        };
                        failures.push(FormError::upload(file.name, err));
                    }
                }
            }
            failures
        }
        .boxed_local()
    }

    /// File collection value for the owning field.
    pub fn to_value(&self) -> Value {
        let files = self
            .entries
            .borrow()
            .iter()
            .map(|entry| {
                let mut file = serde_json::Map::new();
                file.insert("name".to_string(), Value::from(entry.file.name.clone()));
                file.insert("type".to_string(), Value::from(entry.file.mime.clone()));
                file.insert("size".to_string(), Value::from(entry.file.size));
                if let Some(url) = &entry.url {
                    file.insert("url".to_string(), Value::from(url.clone()));
                }
                Value::Object(file)
            })
            .collect();
        Value::Array(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn uploader() -> Rc<dyn Uploader> {
        Rc::new(FakeUploader::new(Duration::from_millis(10)).failing("bad.png"))
    }

    #[tokio::test]
    async fn test_upload_success_sets_url() {
        let upload = FileUpload::new([UploadFile::new("a.png", "image/png", 12)]);
        let failures = upload.upload(uploader(), Value::Null).await;
        assert!(failures.is_empty());
        assert!(upload.is_complete());
        assert_eq!(
            upload.to_value(),
            json!([{
                "name": "a.png",
                "type": "image/png",
                "size": 12,
                "url": "http://localhost/uploads/a.png"
            }])
        );
    }

    #[tokio::test]
    async fn test_upload_failure_marks_complete_with_error() {
        let upload = FileUpload::new([
            UploadFile::new("a.png", "image/png", 1),
            UploadFile::new("bad.png", "image/png", 1),
        ]);
        let failures = upload.upload(uploader(), Value::Null).await;
        assert_eq!(failures.len(), 1);
        assert!(upload.is_complete());
        let entries = upload.entries();
        assert_eq!(entries[0].state, FileState::Complete);
        assert!(matches!(entries[1].state, FileState::Failed { .. }));
        assert_eq!(entries[1].url, None);
    }

    #[tokio::test]
    async fn test_progress_reported() {
        let upload = FileUpload::new([UploadFile::new("a.txt", "text/plain", 3)]);
        let run = upload.upload(uploader(), json!({"duration_ms": 20}));
        assert_eq!(upload.entries()[0].state, FileState::Uploading);
        run.await;
        assert_eq!(upload.entries()[0].progress, 100);
    }

    #[test]
    fn test_from_value_marks_uploaded_files() {
        let value = json!([
            {"name": "a.png", "type": "image/png", "size": 1, "url": "http://x/a.png"},
            {"name": "b.png", "type": "image/png"}
        ]);
        let upload = FileUpload::from_value(&value).unwrap();
        let entries = upload.entries();
        assert!(entries[0].is_complete());
        assert_eq!(entries[1].state, FileState::Pending);
        assert!(FileUpload::from_value(&json!("a.png")).is_none());
    }
}
