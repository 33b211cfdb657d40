use chrono::NaiveDateTime;
use tracing::{debug, info, instrument};

use crate::datastore::TaskStore;
use crate::datetime::{EditableFields, from_editable_fields, to_editable_fields};
use crate::error::{StoreError, ValidationError};
use crate::filter::{CategoryFilter, FilterState, StatusFilter};
use crate::summary::{Summary, summarize};
use crate::task::{Category, NewTask, Task, TaskPatch};

/// Raw form input for creating or editing a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub category: Category,
    pub date_text: String,
    pub time_text: String,
}

impl From<EditableFields> for TaskForm {
    fn from(fields: EditableFields) -> Self {
        Self {
            title: fields.title,
            category: fields.category,
            date_text: fields.date_text,
            time_text: fields.time_text,
        }
    }
}

impl TaskForm {
    fn validate(&self) -> Result<NewTask, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::Missing { field: "title" });
        }
        let deadline = from_editable_fields(&self.date_text, &self.time_text)?;
        Ok(NewTask {
            title: title.to_string(),
            category: self.category,
            deadline,
        })
    }
}

/// Presentation-side view of the store: the last fetched collection plus the
/// active filters. Every mutation goes through the store and is followed by a
/// refresh, so the store's state always wins.
pub struct Session<S: TaskStore> {
    store: S,
    tasks: Vec<Task>,
    filters: FilterState,
}

impl<S: TaskStore> Session<S> {
    #[instrument(skip(store))]
    pub fn open(store: S) -> Result<Self, StoreError> {
        let mut session = Self {
            store,
            tasks: vec![],
            filters: FilterState::default(),
        };
        session.refresh()?;
        Ok(session)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn find(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    #[instrument(skip(self))]
    pub fn refresh(&mut self) -> Result<(), StoreError> {
        self.tasks = self.store.list()?;
        debug!(count = self.tasks.len(), "refreshed task collection");
        Ok(())
    }

    pub fn set_category_filter(&mut self, category: CategoryFilter) {
        self.filters = self.filters.set_category_filter(category);
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.filters = self.filters.set_status_filter(status);
    }

    pub fn visible(&self, now: NaiveDateTime) -> Vec<Task> {
        self.filters.apply(&self.tasks, now)
    }

    pub fn summary(&self, now: NaiveDateTime) -> Summary {
        summarize(&self.tasks, &self.filters.category, now)
    }

    /// Flips completion in memory only. The next refresh replaces it with
    /// whatever the store holds.
    pub fn toggle_local(&mut self, id: u64) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.completed = !task.completed;
                true
            }
            None => false,
        }
    }

    #[instrument(skip(self))]
    pub fn toggle_complete(&mut self, id: u64) -> Result<Task, StoreError> {
        let known = self.find(id).map(|task| task.completed);
        let current = match known {
            Some(completed) => completed,
            None => {
                self.refresh()?;
                self.find(id).ok_or(StoreError::TaskNotFound(id))?.completed
            }
        };

        let updated = self.store.patch(id, &TaskPatch::completed(!current))?;
        self.refresh()?;
        info!(id, completed = updated.completed, "toggled completion");
        Ok(updated)
    }

    #[instrument(skip(self, form))]
    pub fn submit_new(&mut self, form: &TaskForm) -> Result<Task, StoreError> {
        let new = form.validate()?;
        let created = self.store.create(new)?;
        self.refresh()?;
        info!(id = created.id, "task added");
        Ok(created)
    }

    /// Form pre-filled from the stored task, ready for editing.
    pub fn edit_form(&self, id: u64) -> Option<TaskForm> {
        self.find(id).map(|task| to_editable_fields(task).into())
    }

    #[instrument(skip(self, form))]
    pub fn submit_edit(&mut self, id: u64, form: &TaskForm) -> Result<Task, StoreError> {
        let fields = form.validate()?;
        let patch = TaskPatch {
            title: Some(fields.title),
            category: Some(fields.category),
            deadline: Some(fields.deadline),
            completed: None,
        };
        let updated = self.store.patch(id, &patch)?;
        self.refresh()?;
        info!(id, "task updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        self.store.delete(id)?;
        self.refresh()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{Session, TaskForm};
    use crate::datastore::TaskStore;
    use crate::error::{StoreError, ValidationError};
    use crate::filter::{CategoryFilter, StatusFilter};
    use crate::summary::Banner;
    use crate::task::{Category, NewTask, Status, Task, TaskPatch};

    #[derive(Default)]
    struct MemoryStore {
        tasks: Vec<Task>,
        writes: usize,
    }

    impl TaskStore for MemoryStore {
        fn list(&self) -> Result<Vec<Task>, StoreError> {
            Ok(self.tasks.clone())
        }

        fn create(&mut self, new: NewTask) -> Result<Task, StoreError> {
            let id = self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
            let task = Task::new(id, new.title, new.category, new.deadline);
            self.tasks.push(task.clone());
            self.writes += 1;
            Ok(task)
        }

        fn patch(&mut self, id: u64, patch: &TaskPatch) -> Result<Task, StoreError> {
            let task = self
                .tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(StoreError::TaskNotFound(id))?;
            patch.apply(task);
            self.writes += 1;
            Ok(task.clone())
        }

        fn delete(&mut self, id: u64) -> Result<(), StoreError> {
            self.tasks.retain(|t| t.id != id);
            self.writes += 1;
            Ok(())
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .expect("valid now")
    }

    fn form(title: &str, category: Category, date: &str, time: &str) -> TaskForm {
        TaskForm {
            title: title.to_string(),
            category,
            date_text: date.to_string(),
            time_text: time.to_string(),
        }
    }

    #[test]
    fn toggle_goes_through_the_store() {
        let mut session = Session::open(MemoryStore::default()).expect("open");
        let task = session
            .submit_new(&form("report", Category::Work, "2024-03-08", "17:00"))
            .expect("add");
        assert_eq!(session.tasks()[0].status(now()), Status::Failed);

        let toggled = session.toggle_complete(task.id).expect("toggle");
        assert!(toggled.completed);
        assert!(session.store().tasks[0].completed);
        assert_eq!(session.tasks()[0].status(now()), Status::Completed);
    }

    #[test]
    fn refresh_overwrites_local_toggle() {
        let mut session = Session::open(MemoryStore::default()).expect("open");
        let task = session
            .submit_new(&form("gym", Category::Personal, "2024-03-10", "07:00"))
            .expect("add");

        assert!(session.toggle_local(task.id));
        assert!(session.tasks()[0].completed);
        session.refresh().expect("refresh");
        assert!(!session.tasks()[0].completed);
        assert!(!session.toggle_local(999));
    }

    #[test]
    fn invalid_form_never_reaches_the_store() {
        let mut session = Session::open(MemoryStore::default()).expect("open");

        let err = session
            .submit_new(&form("taxes", Category::Others, "", "10:00"))
            .expect_err("missing date");
        assert!(matches!(
            err,
            StoreError::Invalid(ValidationError::Missing { field: "date" })
        ));

        let err = session
            .submit_new(&form("  ", Category::Others, "2024-03-10", "10:00"))
            .expect_err("blank title");
        assert!(matches!(
            err,
            StoreError::Invalid(ValidationError::Missing { field: "title" })
        ));
        assert_eq!(session.store().writes, 0);
    }

    #[test]
    fn edit_form_round_trips_through_submit() {
        let mut session = Session::open(MemoryStore::default()).expect("open");
        let task = session
            .submit_new(&form("draft", Category::Work, "2024-03-10", "14:30"))
            .expect("add");

        let mut edit = session.edit_form(task.id).expect("edit form");
        assert_eq!(edit.date_text, "2024-03-10");
        assert_eq!(edit.time_text, "14:30");

        edit.title = "final".to_string();
        edit.category = Category::Personal;
        let updated = session.submit_edit(task.id, &edit).expect("edit");
        assert_eq!(updated.title, "final");
        assert_eq!(updated.category, Category::Personal);
        assert_eq!(updated.deadline, task.deadline);
    }

    #[test]
    fn banner_ignores_status_filter() {
        let mut session = Session::open(MemoryStore::default()).expect("open");
        session
            .submit_new(&form("late", Category::Work, "2024-03-08", "09:00"))
            .expect("add late");
        session
            .submit_new(&form("soon", Category::Work, "2024-03-10", "09:00"))
            .expect("add soon");
        let done = session
            .submit_new(&form("done", Category::Personal, "2024-03-01", "09:00"))
            .expect("add done");
        session.toggle_complete(done.id).expect("toggle");

        session.set_category_filter(CategoryFilter::Only(Category::Work));
        session.set_status_filter(StatusFilter::Only(Status::Failed));

        assert_eq!(session.visible(now()).len(), 1);
        assert_eq!(
            session.summary(now()).banner,
            Some(Banner::FailedAndPending {
                failed: 1,
                pending: 1
            })
        );

        session.set_category_filter(CategoryFilter::Only(Category::Personal));
        assert_eq!(session.filters().status, StatusFilter::All);
        assert_eq!(session.summary(now()).banner, Some(Banner::AllCompleted));
    }

    #[test]
    fn delete_removes_from_view() {
        let mut session = Session::open(MemoryStore::default()).expect("open");
        let task = session
            .submit_new(&form("tmp", Category::Others, "2024-03-10", "09:00"))
            .expect("add");
        session.delete(task.id).expect("delete");
        assert!(session.tasks().is_empty());
        assert_eq!(session.summary(now()).banner, None);
    }
}
