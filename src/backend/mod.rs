//! Backing stores for task documents
//!
//! The board treats its store as an opaque async document store keyed by
//! user id and task id. Documents come back as raw JSON; shape validation
//! happens in the task store, not here.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::task::{Task, TaskId};

mod documents;
mod local;
mod memory;

pub use documents::DocumentBackend;
pub use local::LocalBackend;
pub use memory::{BackendOp, MemoryBackend};

#[async_trait]
pub trait TaskBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Every stored document for `user`, in store order.
    async fn list_tasks(&self, user: &str) -> Result<Vec<Value>>;

    /// Insert or replace the document with the task's id.
    async fn upsert_task(&self, user: &str, task: &Task) -> Result<()>;

    /// Deleting a document that does not exist succeeds.
    async fn delete_task(&self, user: &str, task_id: &TaskId) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Documents,
    Local,
    Memory,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Documents => "documents",
            BackendKind::Local => "local",
            BackendKind::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "documents" => Ok(BackendKind::Documents),
            "local" => Ok(BackendKind::Local),
            "memory" => Ok(BackendKind::Memory),
            other => Err(Error::InvalidConfig(format!(
                "unknown store kind '{other}' (expected documents|local|memory)"
            ))),
        }
    }
}

/// Open the configured backend over `storage`.
pub fn open_backend(kind: BackendKind, storage: Storage) -> Arc<dyn TaskBackend> {
    tracing::debug!(kind = %kind, root = %storage.root().display(), "opening task backend");
    match kind {
        BackendKind::Documents => Arc::new(DocumentBackend::new(storage)),
        BackendKind::Local => Arc::new(LocalBackend::new(storage)),
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
    }
}

/// The `id` field of a raw document as text, numeric or string.
pub(crate) fn document_id(document: &Value) -> Option<String> {
    match document.get("id")? {
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Run blocking file IO off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| Error::Backend(format!("store task failed: {err}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_id_reads_numbers_and_strings() {
        assert_eq!(document_id(&json!({ "id": 42 })).as_deref(), Some("42"));
        assert_eq!(document_id(&json!({ "id": " abc " })).as_deref(), Some("abc"));
        assert_eq!(document_id(&json!({ "id": "" })), None);
        assert_eq!(document_id(&json!({ "title": "x" })), None);
    }

    #[test]
    fn backend_kind_parses() {
        assert_eq!("Local".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert!("firestore".parse::<BackendKind>().is_err());
    }
}
