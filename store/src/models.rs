//! # Domain models for tasks
//!
//! Defines the data structures managed by [`crate::TaskStore`] and the view
//! parameters accepted by its derived-list operations. These types are
//! `Serialize + Deserialize`; the persisted JSON uses camelCase field names
//! (`createdAt`) and lowercase priority values so collections written by the
//! original web client load unchanged.
//!
//! ## Types
//!
//! | Type | Represents |
//! |------|-----------|
//! | [`Task`] | A single to-do item: opaque unique `id`, `title`, `completed` flag, [`Priority`], and immutable `created_at` timestamp. |
//! | [`Priority`] | `Low` / `Medium` / `High`, default `Medium`. [`Priority::rank`] gives the sort order (high first). |
//! | [`Filter`] | View selector: `All`, `Active` (not completed), `Completed`. |
//! | [`SortKey`] | Ordering: `Newest` / `Oldest` by creation time, `Priority` high → low. |
//!
//! [`Filter`] and [`SortKey`] implement `FromStr` so UI-supplied strings are
//! validated at the boundary.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task priority level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Sort rank: high → medium → low.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

/// A single to-do item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque unique id, generated at creation.
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub priority: Priority,
    /// Creation time, immutable. Serialized as an RFC 3339 string.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Construct a fresh task: new v4 id, not completed, created now.
    pub fn new(title: &str, priority: Priority) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            completed: false,
            priority,
            created_at: Utc::now(),
        }
    }
}

/// View filter for task lists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            _ => Err(format!("unknown filter: {s}")),
        }
    }
}

/// Sort order for task lists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Priority,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(SortKey::Newest),
            "oldest" => Ok(SortKey::Oldest),
            "priority" => Ok(SortKey::Priority),
            _ => Err(format!("unknown sort key: {s}")),
        }
    }
}
