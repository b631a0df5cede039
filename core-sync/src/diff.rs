//! Desired vs observed attribute comparison

use std::fmt;

use crate::state::{ObservedQueue, QueueSpec};

/// Mutable attributes that differ between a spec and the remote queue.
///
/// Tags compare as ordered lists: a reordering is a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueDiff {
    pub name: Option<Change<String>>,
    pub tags: Option<Change<Vec<String>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change<T> {
    pub from: T,
    pub to: T,
}

impl QueueDiff {
    pub fn between(desired: &QueueSpec, observed: &ObservedQueue) -> Self {
        let name = (desired.name() != observed.name).then(|| Change {
            from: observed.name.clone(),
            to: desired.name().to_string(),
        });
        let tags = (desired.tags() != observed.tags.as_slice()).then(|| Change {
            from: observed.tags.clone(),
            to: desired.tags().to_vec(),
        });

        Self { name, tags }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tags.is_none()
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.tags.is_some() {
            fields.push("tags");
        }
        fields
    }
}

impl fmt::Display for QueueDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no changes");
        }
        f.write_str(&self.changed_fields().join(", "))
    }
}
