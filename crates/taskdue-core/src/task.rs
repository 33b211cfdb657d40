use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::datetime::deadline_serde;
use crate::error::UnknownCategory;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    #[default]
    Work,
    Personal,
    Others,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Work, Category::Personal, Category::Others];

    pub fn name(self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Others => "Others",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|cat| cat.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategory {
                kind: "category",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for Category {
    type Error = UnknownCategory;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.name().to_string()
    }
}

/// Derived classification of a task. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Completed,
    Failed,
}

impl Status {
    pub fn name(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Completed => "Completed",
            Status::Failed => "Failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,

    pub title: String,

    pub category: Category,

    #[serde(with = "deadline_serde")]
    pub deadline: NaiveDateTime,

    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(id: u64, title: String, category: Category, deadline: NaiveDateTime) -> Self {
        Self {
            id,
            title,
            category,
            deadline,
            completed: false,
        }
    }

    pub fn status(&self, now: NaiveDateTime) -> Status {
        derive_status(self, now)
    }
}

/// Classifies a task against `now`.
///
/// Completion wins over the deadline. An open task is pending only while its
/// deadline is strictly in the future, so `deadline == now` already reads as
/// failed.
pub fn derive_status(task: &Task, now: NaiveDateTime) -> Status {
    if task.completed {
        Status::Completed
    } else if task.deadline > now {
        Status::Pending
    } else {
        Status::Failed
    }
}

/// Fields supplied when creating a task; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub category: Category,
    pub deadline: NaiveDateTime,
}

/// Partial update. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub category: Option<Category>,
    pub deadline: Option<NaiveDateTime>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.category.is_none()
            && self.deadline.is_none()
            && self.completed.is_none()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}
