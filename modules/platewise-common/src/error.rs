use thiserror::Error;
use uuid::Uuid;

use crate::types::TaskState;

pub type Result<T> = std::result::Result<T, PlatewiseError>;

#[derive(Error, Debug)]
pub enum PlatewiseError {
    /// A short link could not be expanded into a canonical place or search URL.
    #[error("Could not resolve link: {0}")]
    Resolution(String),

    #[error("Scraping error: {0}")]
    Scrape(String),

    #[error("Summarizer returned unparseable output: {0}")]
    SummarizerParse(String),

    #[error("Summarizer call failed: {0}")]
    SummarizerCall(String),

    #[error("Task not found: {0}")]
    UnknownTask(Uuid),

    #[error("Invalid transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: Uuid,
        from: TaskState,
        to: TaskState,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}
