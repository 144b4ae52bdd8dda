//! One JSON document per task under `users/<user>/tasks/`.

use std::fs;

use async_trait::async_trait;
use serde_json::Value;

use super::{blocking, TaskBackend};
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::task::{Task, TaskId};

#[derive(Debug, Clone)]
pub struct DocumentBackend {
    storage: Storage,
}

impl DocumentBackend {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

fn list_documents(storage: &Storage, user: &str) -> Result<Vec<Value>> {
    let dir = storage.tasks_dir(user)?;
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(Error::Io(err)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        // A document that is unreadable JSON is passed on as a non-object so
        // the task store can count it as invalid without failing the load.
        match storage.read_json::<Value>(&path) {
            Ok(Some(document)) => documents.push(document),
            Ok(None) => {}
            Err(Error::Json(err)) => {
                tracing::warn!(path = %path.display(), error = %err, "unparseable task document");
                documents.push(Value::Null);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(documents)
}

#[async_trait]
impl TaskBackend for DocumentBackend {
    fn name(&self) -> &str {
        "documents"
    }

    async fn list_tasks(&self, user: &str) -> Result<Vec<Value>> {
        let storage = self.storage.clone();
        let user = user.to_string();
        blocking(move || list_documents(&storage, &user)).await
    }

    async fn upsert_task(&self, user: &str, task: &Task) -> Result<()> {
        let storage = self.storage.clone();
        let path = storage.task_document(user, task.id.as_str())?;
        let document = task.to_document()?;
        blocking(move || storage.write_json(&path, &document)).await
    }

    async fn delete_task(&self, user: &str, task_id: &TaskId) -> Result<()> {
        let storage = self.storage.clone();
        let path = storage.task_document(user, task_id.as_str())?;
        blocking(move || storage.remove_file(&path).map(|_| ())).await
    }
}
