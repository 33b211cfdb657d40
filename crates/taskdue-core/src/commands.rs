use std::io::{self, BufRead, Write};

use anyhow::{Context, anyhow};
use chrono::NaiveDateTime;
use tracing::{debug, info, instrument, warn};

use crate::cli::Command;
use crate::config::Config;
use crate::datastore::TaskStore;
use crate::datetime::to_editable_fields;
use crate::error::StoreError;
use crate::filter::{CategoryFilter, StatusFilter};
use crate::render::Renderer;
use crate::session::{Session, TaskForm};
use crate::task::Category;

#[instrument(skip(session, cfg, renderer, command, now))]
pub fn dispatch<S: TaskStore>(
    session: &mut Session<S>,
    cfg: &Config,
    renderer: &Renderer,
    command: Command,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    debug!(?command, %now, "dispatching command");

    match command {
        Command::List { category, status } => cmd_list(session, renderer, category, status, now),
        Command::Add {
            title,
            category,
            date,
            time,
        } => cmd_add(session, title, category, date, time),
        Command::Edit {
            id,
            title,
            category,
            date,
            time,
        } => cmd_edit(session, id, title, category, date, time),
        Command::Toggle { id } => cmd_toggle(session, id, now),
        Command::Delete { id, yes } => cmd_delete(session, cfg, id, yes),
        Command::Show { id } => cmd_show(session, renderer, id, now),
    }
}

#[instrument(skip(session, renderer, now))]
fn cmd_list<S: TaskStore>(
    session: &mut Session<S>,
    renderer: &Renderer,
    category: CategoryFilter,
    status: StatusFilter,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command list");

    if let CategoryFilter::Unrecognized(raw) = &category {
        let known: Vec<String> = CategoryFilter::options()
            .iter()
            .map(|option| option.label().to_string())
            .collect();
        warn!(category = %raw, known = %known.join(", "), "unknown category; no task matches");
    }
    session.set_category_filter(category);
    session.set_status_filter(status);

    let visible = session.visible(now);
    let summary = session.summary(now);
    debug!(
        visible = visible.len(),
        total = session.tasks().len(),
        "computed task view"
    );
    renderer.print_task_view(&session.filters().category, &summary, &visible, now)
}

#[instrument(skip(session, title, date, time))]
fn cmd_add<S: TaskStore>(
    session: &mut Session<S>,
    title: Vec<String>,
    category: Category,
    date: String,
    time: String,
) -> anyhow::Result<()> {
    info!("command add");

    let form = TaskForm {
        title: title.join(" "),
        category,
        date_text: date,
        time_text: time,
    };
    let task = session.submit_new(&form).context("task was not created")?;
    println!("Created task {}.", task.id);
    Ok(())
}

#[instrument(skip(session, title, date, time))]
fn cmd_edit<S: TaskStore>(
    session: &mut Session<S>,
    id: u64,
    title: Option<String>,
    category: Option<Category>,
    date: Option<String>,
    time: Option<String>,
) -> anyhow::Result<()> {
    info!("command edit");

    if title.is_none() && category.is_none() && date.is_none() && time.is_none() {
        return Err(anyhow!(
            "edit requires at least one of --title, --category, --date, --time"
        ));
    }

    let mut form = session
        .edit_form(id)
        .ok_or(StoreError::TaskNotFound(id))?;
    if let Some(title) = title {
        form.title = title;
    }
    if let Some(category) = category {
        form.category = category;
    }
    if let Some(date) = date {
        form.date_text = date;
    }
    if let Some(time) = time {
        form.time_text = time;
    }

    let task = session
        .submit_edit(id, &form)
        .with_context(|| format!("task {id} was not updated"))?;
    println!("Modified task {}.", task.id);
    Ok(())
}

#[instrument(skip(session, now))]
fn cmd_toggle<S: TaskStore>(
    session: &mut Session<S>,
    id: u64,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command toggle");

    let task = session.toggle_complete(id)?;
    println!("Task {} is now {}.", task.id, task.status(now).name().to_lowercase());
    Ok(())
}

#[instrument(skip(session, cfg))]
fn cmd_delete<S: TaskStore>(
    session: &mut Session<S>,
    cfg: &Config,
    id: u64,
    yes: bool,
) -> anyhow::Result<()> {
    info!("command delete");

    let title = session
        .find(id)
        .map(|task| task.title.clone())
        .ok_or(StoreError::TaskNotFound(id))?;

    let must_confirm = !yes && cfg.confirm_delete;
    if must_confirm && !confirm(&format!("Delete task {id} '{title}'?"))? {
        println!("Task not deleted.");
        return Ok(());
    }

    session.delete(id)?;
    println!("Deleted task {id} '{title}'.");
    Ok(())
}

#[instrument(skip(session, renderer, now))]
fn cmd_show<S: TaskStore>(
    session: &mut Session<S>,
    renderer: &Renderer,
    id: u64,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command show");

    let task = session.find(id).ok_or(StoreError::TaskNotFound(id))?;
    renderer.print_task_fields(task.id, &to_editable_fields(task), task.status(now))
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    let mut out = io::stdout().lock();
    write!(out, "{prompt} (yes/no) ")?;
    out.flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed reading confirmation")?;
    Ok(is_affirmative(&answer))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::is_affirmative;

    #[test]
    fn only_yes_confirms() {
        assert!(is_affirmative("yes\n"));
        assert!(is_affirmative(" Y "));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative(""));
    }
}
