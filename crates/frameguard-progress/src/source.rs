//! Progress sources
//!
//! The producing task publishes snapshots somewhere; the display polls them
//! back by task identity.

use crate::error::SourceError;
use crate::snapshot::ProgressSnapshot;
use async_trait::async_trait;
use dashmap::DashMap;
use frameguard_core::TaskId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where progress snapshots are read from
#[async_trait]
pub trait ProgressSource: Send + Sync {
    /// Latest snapshot for `task_id`, `None` if nothing was published
    async fn fetch(&self, task_id: &TaskId) -> Result<Option<ProgressSnapshot>, SourceError>;
}

#[async_trait]
impl<S: ProgressSource + ?Sized> ProgressSource for Arc<S> {
    async fn fetch(&self, task_id: &TaskId) -> Result<Option<ProgressSnapshot>, SourceError> {
        (**self).fetch(task_id).await
    }
}

/// In-process snapshot store
///
/// Clones share the same store: hand one to the producer, one to the display.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    inner: Arc<DashMap<TaskId, ProgressSnapshot>>,
}

impl MemorySource {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (replace) the snapshot for its analysis id
    pub fn publish(&self, snapshot: ProgressSnapshot) {
        self.inner.insert(snapshot.analysis_id.clone(), snapshot);
    }

    /// Drop the snapshot for `task_id`
    pub fn remove(&self, task_id: &TaskId) -> Option<ProgressSnapshot> {
        self.inner.remove(task_id).map(|(_, snapshot)| snapshot)
    }

    /// Number of published tasks
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if nothing is published
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl ProgressSource for MemorySource {
    async fn fetch(&self, task_id: &TaskId) -> Result<Option<ProgressSnapshot>, SourceError> {
        Ok(self.inner.get(task_id).map(|entry| entry.value().clone()))
    }
}

/// Snapshots stored as `<dir>/<task_id>.json`
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    /// Read snapshots from `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory being read
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the snapshot for `task_id`
    ///
    /// # Errors
    /// - `SourceError::InvalidTaskId` if the id would escape the directory
    pub fn path_for(&self, task_id: &TaskId) -> Result<PathBuf, SourceError> {
        let id = task_id.as_str();
        if id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(SourceError::InvalidTaskId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

#[async_trait]
impl ProgressSource for FileSource {
    async fn fetch(&self, task_id: &TaskId) -> Result<Option<ProgressSnapshot>, SourceError> {
        let path = self.path_for(task_id)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let snapshot = serde_json::from_slice(&bytes)?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ProgressStatus;

    fn id(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    #[tokio::test]
    async fn memory_source_publish_fetch_remove() {
        let source = MemorySource::new();
        let producer = source.clone();
        assert!(source.fetch(&id("a")).await.unwrap().is_none());

        producer.publish(ProgressSnapshot::new(id("a")).with_percentage(10.0));
        let snap = source.fetch(&id("a")).await.unwrap().unwrap();
        assert_eq!(snap.progress_percentage, 10.0);
        assert_eq!(source.len(), 1);

        producer.publish(ProgressSnapshot::new(id("a")).with_status(ProgressStatus::Completed));
        let snap = source.fetch(&id("a")).await.unwrap().unwrap();
        assert_eq!(snap.status, ProgressStatus::Completed);

        assert!(producer.remove(&id("a")).is_some());
        assert!(source.is_empty());
    }

    #[tokio::test]
    async fn file_source_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path());
        assert!(source.fetch(&id("nothing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_source_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("run-9.json"),
            r#"{"analysis_id":"run-9","status":"failed","last_message":"quota"}"#,
        )
        .unwrap();

        let snap = FileSource::new(dir.path()).fetch(&id("run-9")).await.unwrap().unwrap();
        assert_eq!(snap.status, ProgressStatus::Failed);
        assert_eq!(snap.last_message, "quota");
    }

    #[tokio::test]
    async fn file_source_bad_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run-1.json"), b"{ not json").unwrap();
        let err = FileSource::new(dir.path()).fetch(&id("run-1")).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn file_source_rejects_path_escape() {
        let source = FileSource::new("/tmp/progress");
        assert!(matches!(source.path_for(&id("../etc/passwd")), Err(SourceError::InvalidTaskId(_))));
        assert!(source.path_for(&id("..")).is_err());
        assert_eq!(
            source.path_for(&id("ok")).unwrap(),
            PathBuf::from("/tmp/progress/ok.json")
        );
    }
}
