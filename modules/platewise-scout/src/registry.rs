use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use platewise_common::error::Result;
use platewise_common::{JobKind, PlatewiseError, TaskState};

/// Snapshot of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: Uuid,
    pub kind: JobKind,
    pub state: TaskState,
    /// Set once, together with the terminal state.
    pub result: Option<Value>,
    /// Every state the task has been in, oldest first.
    pub history: Vec<TaskState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory task table, shared between request handlers and background jobs.
///
/// Entries live for the life of the process. Each entry is written only by the
/// job that owns it; every write is checked against the job's state path so a
/// task can never move backwards or leave a terminal state.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<Uuid, TaskRecord>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new task in `INITIALIZED` and return its id.
    pub async fn create(&self, kind: JobKind) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let record = TaskRecord {
            id,
            kind,
            state: TaskState::Initialized,
            result: None,
            history: vec![TaskState::Initialized],
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().await.insert(id, record);
        info!(task_id = %id, kind = ?kind, "Task created");
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<TaskRecord> {
        self.tasks.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Move a task to the next non-terminal state on its path.
    pub async fn advance(&self, id: Uuid, to: TaskState) -> Result<()> {
        if to.is_terminal() {
            return self.reject(id, to).await;
        }
        self.transition(id, to, None).await
    }

    /// Finish a task successfully with its result payload.
    pub async fn complete(&self, id: Uuid, result: Value) -> Result<()> {
        self.transition(id, TaskState::Completed, Some(result)).await
    }

    /// Fail a task. The result becomes `{"error": message}`.
    pub async fn fail(&self, id: Uuid, message: &str) -> Result<()> {
        self.transition(id, TaskState::Failed, Some(json!({ "error": message })))
            .await
    }

    async fn transition(&self, id: Uuid, to: TaskState, result: Option<Value>) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let record = tasks.get_mut(&id).ok_or(PlatewiseError::UnknownTask(id))?;

        let from = record.state;
        if !record.kind.allows(from, to) {
            warn!(task_id = %id, %from, %to, "Rejected task transition");
            return Err(PlatewiseError::InvalidTransition { task_id: id, from, to });
        }

        record.state = to;
        record.history.push(to);
        record.updated_at = Utc::now();
        if to.is_terminal() {
            record.result = result;
        }
        info!(task_id = %id, %from, %to, "Task state changed");
        Ok(())
    }

    async fn reject(&self, id: Uuid, to: TaskState) -> Result<()> {
        let tasks = self.tasks.read().await;
        let record = tasks.get(&id).ok_or(PlatewiseError::UnknownTask(id))?;
        warn!(task_id = %id, from = %record.state, %to, "Terminal states need a result");
        Err(PlatewiseError::InvalidTransition {
            task_id: id,
            from: record.state,
            to,
        })
    }
}
