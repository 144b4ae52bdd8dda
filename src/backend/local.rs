//! Whole collection stored as one JSON array per user, the layout the board
//! uses when it runs against browser local storage.

use async_trait::async_trait;
use serde_json::Value;

use super::{blocking, document_id, TaskBackend};
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::task::{Task, TaskId};

#[derive(Debug, Clone)]
pub struct LocalBackend {
    storage: Storage,
}

impl LocalBackend {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl TaskBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn list_tasks(&self, user: &str) -> Result<Vec<Value>> {
        let storage = self.storage.clone();
        let path = storage.local_tasks_file(user)?;
        blocking(move || {
            let documents = match storage.read_json::<Value>(&path)? {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(Error::Backend(format!(
                        "{} does not hold a task array",
                        path.display()
                    )))
                }
            };
            Ok(documents)
        })
        .await
    }

    async fn upsert_task(&self, user: &str, task: &Task) -> Result<()> {
        let storage = self.storage.clone();
        let path = storage.local_tasks_file(user)?;
        let id = task.id.as_str().to_string();
        let document = task.to_document()?;
        blocking(move || {
            storage.update_json(&path, |documents: &mut Vec<Value>| {
                match documents
                    .iter_mut()
                    .find(|existing| document_id(existing).as_deref() == Some(id.as_str()))
                {
                    Some(existing) => *existing = document,
                    None => documents.push(document),
                }
                Ok(())
            })
        })
        .await
    }

    async fn delete_task(&self, user: &str, task_id: &TaskId) -> Result<()> {
        let storage = self.storage.clone();
        let path = storage.local_tasks_file(user)?;
        let id = task_id.as_str().to_string();
        blocking(move || {
            storage.update_json(&path, |documents: &mut Vec<Value>| {
                documents.retain(|existing| document_id(existing).as_deref() != Some(id.as_str()));
                Ok(())
            })
        })
        .await
    }
}
