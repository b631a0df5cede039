//! # Desired and Observed Queue State
//!
//! ```text
//!            create              update
//!   Absent ─────────→ Present ─────────→ Present
//!     ↑                  │
//!     └──────────────────┘
//!            delete
//! ```
//!
//! There is no durable intermediate state. A queue is `Present` once an
//! identifier is held and its attributes were confirmed by a read.

use provider_clearml::QueueRecord;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// What the caller wants a queue to look like.
///
/// Built through [`QueueSpec::new`]; the name is required and tags are sent
/// as given, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSpec {
    name: String,
    tags: Vec<String>,
}

impl QueueSpec {
    pub fn new<I, S>(name: impl Into<String>, tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SyncError::InvalidSpec(
                "queue name must not be empty".to_string(),
            ));
        }

        let tags = tags.into_iter().map(Into::into).collect();
        Ok(Self { name, tags })
    }

    /// Spec with a name and no tags
    pub fn named(name: impl Into<String>) -> Result<Self> {
        Self::new(name, Vec::<String>::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// A queue as last confirmed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedQueue {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub system_tags: Vec<String>,
    /// Server timestamp, passed through unparsed
    #[serde(default)]
    pub created: Option<String>,
    /// Tasks currently waiting in the queue
    #[serde(default)]
    pub entry_count: usize,
}

impl From<QueueRecord> for ObservedQueue {
    fn from(record: QueueRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            tags: record.tags,
            system_tags: record.system_tags,
            created: record.created,
            entry_count: record.entries.len(),
        }
    }
}

/// Remote existence of a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    Absent,
    Present(ObservedQueue),
}

impl ResourceState {
    pub fn is_present(&self) -> bool {
        matches!(self, ResourceState::Present(_))
    }

    pub fn queue(&self) -> Option<&ObservedQueue> {
        match self {
            ResourceState::Present(queue) => Some(queue),
            ResourceState::Absent => None,
        }
    }
}

/// How a delete reached the absent state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The server no longer knew the queue
    AlreadyAbsent,
}
