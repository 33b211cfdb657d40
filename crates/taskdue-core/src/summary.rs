use std::fmt;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::filter::{CategoryFilter, StatusFilter};
use crate::task::{Status, Task, derive_status};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub failed: usize,
    pub pending: usize,
}

/// Failed and pending counts over the category-matching tasks.
///
/// The status filter is not an input; the banner describes the whole
/// category.
pub fn count_by_status(
    tasks: &[Task],
    category: &CategoryFilter,
    now: NaiveDateTime,
) -> StatusCounts {
    tasks
        .iter()
        .filter(|task| category.matches(task))
        .fold(StatusCounts::default(), |mut acc, task| {
            match derive_status(task, now) {
                Status::Failed => acc.failed += 1,
                Status::Pending => acc.pending += 1,
                Status::Completed => {}
            }
            acc
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    FailedAndPending { failed: usize, pending: usize },
    FailedOnly { failed: usize },
    PendingOnly { pending: usize },
    AllCompleted,
}

impl Banner {
    /// Picks the banner for a category. `matched` is the size of the
    /// category-filtered set; an empty set gets no banner at all.
    pub fn select(counts: StatusCounts, matched: usize) -> Option<Banner> {
        if matched == 0 {
            return None;
        }
        let banner = match (counts.failed, counts.pending) {
            (0, 0) => Banner::AllCompleted,
            (failed, 0) => Banner::FailedOnly { failed },
            (0, pending) => Banner::PendingOnly { pending },
            (failed, pending) => Banner::FailedAndPending { failed, pending },
        };
        Some(banner)
    }

    /// Status filters the banner links to, in display order.
    pub fn targets(self) -> Vec<StatusFilter> {
        match self {
            Banner::FailedAndPending { .. } => vec![
                StatusFilter::Only(Status::Failed),
                StatusFilter::Only(Status::Pending),
            ],
            Banner::FailedOnly { .. } => vec![StatusFilter::Only(Status::Failed)],
            Banner::PendingOnly { .. } => vec![StatusFilter::Only(Status::Pending)],
            Banner::AllCompleted => vec![],
        }
    }
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Banner::FailedAndPending { failed, pending } => write!(
                f,
                "❗ {failed} {} failed and {pending} pending.",
                plural_task(failed)
            ),
            Banner::FailedOnly { failed } => {
                write!(f, "❗ {failed} {} failed.", plural_task(failed))
            }
            Banner::PendingOnly { pending } => {
                write!(f, "{pending} {} pending.", plural_task(pending))
            }
            Banner::AllCompleted => f.write_str("✅ All tasks completed!"),
        }
    }
}

fn plural_task(count: usize) -> &'static str {
    if count > 1 { "tasks" } else { "task" }
}

/// Everything the presentation layer needs about one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub counts: StatusCounts,
    pub matched: usize,
    pub banner: Option<Banner>,
}

#[tracing::instrument(skip(tasks, now))]
pub fn summarize(tasks: &[Task], category: &CategoryFilter, now: NaiveDateTime) -> Summary {
    let counts = count_by_status(tasks, category, now);
    let matched = tasks.iter().filter(|task| category.matches(task)).count();
    let banner = Banner::select(counts, matched);
    debug!(
        failed = counts.failed,
        pending = counts.pending,
        matched,
        ?banner,
        "summarized category"
    );
    Summary {
        counts,
        matched,
        banner,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use super::{Banner, StatusCounts, count_by_status, summarize};
    use crate::filter::{CategoryFilter, StatusFilter};
    use crate::task::{Category, Status, Task};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 16)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid now")
    }

    fn task(id: u64, category: Category, offset_hours: i64, completed: bool) -> Task {
        let mut t = Task::new(
            id,
            format!("task {id}"),
            category,
            now() + Duration::hours(offset_hours),
        );
        t.completed = completed;
        t
    }

    #[test]
    fn counts_only_the_selected_category() {
        let tasks = vec![
            task(1, Category::Work, -24, false),
            task(2, Category::Work, 24, false),
            task(3, Category::Personal, -24, true),
        ];

        let counts = count_by_status(&tasks, &CategoryFilter::Only(Category::Work), now());
        assert_eq!(
            counts,
            StatusCounts {
                failed: 1,
                pending: 1
            }
        );

        let summary = summarize(&tasks, &CategoryFilter::Only(Category::Work), now());
        assert_eq!(
            summary.banner,
            Some(Banner::FailedAndPending {
                failed: 1,
                pending: 1
            })
        );
    }

    #[test]
    fn counts_never_exceed_matching_subset() {
        let tasks = vec![
            task(1, Category::Work, -1, false),
            task(2, Category::Work, 1, true),
            task(3, Category::Others, 1, false),
            task(4, Category::Others, -1, true),
            task(5, Category::Personal, 0, false),
        ];
        for filter in CategoryFilter::options() {
            let summary = summarize(&tasks, &filter, now());
            assert!(summary.counts.failed + summary.counts.pending <= summary.matched);
        }
    }

    #[test]
    fn banner_states_are_exclusive() {
        assert_eq!(Banner::select(StatusCounts::default(), 0), None);
        assert_eq!(
            Banner::select(StatusCounts::default(), 3),
            Some(Banner::AllCompleted)
        );
        assert_eq!(
            Banner::select(
                StatusCounts {
                    failed: 2,
                    pending: 0
                },
                2
            ),
            Some(Banner::FailedOnly { failed: 2 })
        );
        assert_eq!(
            Banner::select(
                StatusCounts {
                    failed: 0,
                    pending: 1
                },
                4
            ),
            Some(Banner::PendingOnly { pending: 1 })
        );
    }

    #[test]
    fn empty_category_has_no_banner() {
        let tasks = vec![task(1, Category::Work, 5, false)];
        let summary = summarize(&tasks, &CategoryFilter::Only(Category::Others), now());
        assert_eq!(summary.matched, 0);
        assert_eq!(summary.banner, None);
    }

    #[test]
    fn banner_text_pluralizes() {
        assert_eq!(
            Banner::FailedAndPending {
                failed: 2,
                pending: 1
            }
            .to_string(),
            "❗ 2 tasks failed and 1 pending."
        );
        assert_eq!(
            Banner::FailedOnly { failed: 1 }.to_string(),
            "❗ 1 task failed."
        );
        assert_eq!(
            Banner::PendingOnly { pending: 3 }.to_string(),
            "3 tasks pending."
        );
        assert_eq!(Banner::AllCompleted.to_string(), "✅ All tasks completed!");
    }

    #[test]
    fn banner_links_to_status_filters() {
        assert_eq!(
            Banner::FailedAndPending {
                failed: 1,
                pending: 1
            }
            .targets(),
            vec![
                StatusFilter::Only(Status::Failed),
                StatusFilter::Only(Status::Pending)
            ]
        );
        assert!(Banner::AllCompleted.targets().is_empty());
    }
}
