//! ClearML `queues.*` request and response bodies

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Serialize)]
pub struct CreateQueueRequest<'a> {
    pub name: &'a str,
    pub tags: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct CreateQueueResponse {
    pub data: CreatedQueue,
}

#[derive(Debug, Deserialize)]
pub struct CreatedQueue {
    pub id: String,
}

/// Body shared by `queues.get_by_id` and `queues.delete`
#[derive(Debug, Serialize)]
pub struct QueueIdRequest<'a> {
    pub queue: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GetQueueResponse {
    pub data: QueueEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct QueueEnvelope {
    pub queue: QueueRecord,
}

#[derive(Debug, Serialize)]
pub struct UpdateQueueRequest<'a> {
    pub queue: &'a str,
    pub name: &'a str,
    pub tags: &'a [String],
}

/// Queue as reported by `queues.get_by_id`.
///
/// Unknown fields are ignored. `null` lists decode as empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueRecord {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub system_tags: Vec<String>,
    /// Raw server timestamp
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub entries: Vec<QueueEntry>,
}

/// A task waiting in a queue
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueEntry {
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub added: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
