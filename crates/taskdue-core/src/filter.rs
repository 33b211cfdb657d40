use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use tracing::trace;

use crate::error::UnknownCategory;
use crate::task::{
  Category,
  Status,
  Task,
  derive_status
};

pub const ALL_TASKS_LABEL: &str =
  "All Tasks";
pub const ALL_STATUSES_LABEL: &str =
  "All";

#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub enum CategoryFilter {
  #[default]
  All,
  Only(Category),
  /// A label outside the fixed set. It
  /// matches no task.
  Unrecognized(String)
}

impl CategoryFilter {
  /// Every selectable filter in display
  /// order.
  pub fn options() -> Vec<CategoryFilter>
  {
    let mut out =
      vec![CategoryFilter::All];
    out.extend(
      Category::ALL
        .into_iter()
        .map(CategoryFilter::Only)
    );
    out
  }

  /// Lenient constructor for labels
  /// coming from outside; never fails.
  pub fn from_label(
    label: &str
  ) -> Self {
    label.parse().unwrap_or_else(
      |_: UnknownCategory| {
        CategoryFilter::Unrecognized(
          label.to_string()
        )
      }
    )
  }

  pub fn label(&self) -> &str {
    match self {
      | CategoryFilter::All => {
        ALL_TASKS_LABEL
      }
      | CategoryFilter::Only(cat) => {
        cat.name()
      }
      | CategoryFilter::Unrecognized(
        raw
      ) => raw.as_str()
    }
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    match self {
      | CategoryFilter::All => true,
      | CategoryFilter::Only(cat) => {
        task
          .category
          .name()
          .eq_ignore_ascii_case(
            cat.name()
          )
      }
      | CategoryFilter::Unrecognized(
        _
      ) => false
    }
  }
}

impl fmt::Display for CategoryFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for CategoryFilter {
  type Err = UnknownCategory;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    if trimmed
      .eq_ignore_ascii_case(ALL_TASKS_LABEL)
      || trimmed
        .eq_ignore_ascii_case("all")
    {
      return Ok(CategoryFilter::All);
    }
    trimmed
      .parse::<Category>()
      .map(CategoryFilter::Only)
      .map_err(|_| UnknownCategory {
        kind:  "category filter",
        value: s.to_string()
      })
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum StatusFilter {
  #[default]
  All,
  Only(Status)
}

impl StatusFilter {
  pub fn label(self) -> &'static str {
    match self {
      | StatusFilter::All => {
        ALL_STATUSES_LABEL
      }
      | StatusFilter::Only(status) => {
        status.name()
      }
    }
  }

  pub fn matches(
    self,
    task: &Task,
    now: NaiveDateTime
  ) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Only(status) => {
        derive_status(task, now)
          == status
      }
    }
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for StatusFilter {
  type Err = UnknownCategory;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(StatusFilter::All),
      | "pending" => Ok(
        StatusFilter::Only(
          Status::Pending
        )
      ),
      | "completed" => Ok(
        StatusFilter::Only(
          Status::Completed
        )
      ),
      | "failed" => Ok(
        StatusFilter::Only(
          Status::Failed
        )
      ),
      | _ => Err(UnknownCategory {
        kind:  "status filter",
        value: s.to_string()
      })
    }
  }
}

/// The pair of filters governing the
/// visible task list.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct FilterState {
  pub category: CategoryFilter,
  pub status:   StatusFilter
}

impl FilterState {
  /// Switching category always clears
  /// the status filter, so a stale
  /// status from another category is
  /// never observed.
  #[must_use]
  pub fn set_category_filter(
    &self,
    category: CategoryFilter
  ) -> Self {
    Self {
      category,
      status: StatusFilter::All
    }
  }

  #[must_use]
  pub fn set_status_filter(
    &self,
    status: StatusFilter
  ) -> Self {
    Self {
      category: self.category.clone(),
      status
    }
  }

  pub fn apply(
    &self,
    tasks: &[Task],
    now: NaiveDateTime
  ) -> Vec<Task> {
    filter_and_sort(
      tasks,
      &self.category,
      self.status,
      now
    )
  }
}

/// Tasks matching both filters, earliest
/// deadline first. Ties keep collection
/// order.
#[tracing::instrument(skip(
  tasks, now
))]
pub fn filter_and_sort(
  tasks: &[Task],
  category: &CategoryFilter,
  status: StatusFilter,
  now: NaiveDateTime
) -> Vec<Task> {
  let mut out: Vec<Task> = tasks
    .iter()
    .filter(|task| {
      let ok = category.matches(task)
        && status.matches(task, now);
      trace!(id = task.id, ok, "filter evaluation");
      ok
    })
    .cloned()
    .collect();

  out.sort_by_key(|task| task.deadline);
  out
}
