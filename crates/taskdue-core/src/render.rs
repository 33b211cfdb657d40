use std::io::{self, IsTerminal, Write};

use chrono::NaiveDateTime;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{EditableFields, format_display};
use crate::filter::CategoryFilter;
use crate::summary::{Banner, Summary};
use crate::task::{Status, Task};

pub const EMPTY_LIST_MESSAGE: &str = "No tasks match the selected filters.";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Colour only when enabled in config and stdout is a terminal.
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, summary, tasks, now))]
    pub fn print_task_view(
        &self,
        category: &CategoryFilter,
        summary: &Summary,
        tasks: &[Task],
        now: NaiveDateTime,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_task_view(&mut out, category, summary, tasks, now)
    }

    /// Banner, the list commands it points at, then the table.
    pub fn write_task_view<W: Write>(
        &self,
        mut out: W,
        category: &CategoryFilter,
        summary: &Summary,
        tasks: &[Task],
        now: NaiveDateTime,
    ) -> anyhow::Result<()> {
        if let Some(banner) = summary.banner {
            writeln!(out, "{banner}")?;
            for command in banner_commands(banner, category) {
                writeln!(out, "  see: {command}")?;
            }
            writeln!(out)?;
        }

        if tasks.is_empty() {
            writeln!(out, "{EMPTY_LIST_MESSAGE}")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Title".to_string(),
            "Category".to_string(),
            "Deadline".to_string(),
            "Status".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let status = task.status(now);
                vec![
                    self.paint(&task.id.to_string(), "33"),
                    task.title.clone(),
                    task.category.to_string(),
                    format_display(task.deadline),
                    self.paint(&status.name().to_uppercase(), status_color(status)),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, fields))]
    pub fn print_task_fields(
        &self,
        id: u64,
        fields: &EditableFields,
        status: Status,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "id        {id}")?;
        writeln!(out, "title     {}", fields.title)?;
        writeln!(out, "category  {}", fields.category)?;
        writeln!(out, "date      {}", fields.date_text)?;
        writeln!(out, "time      {}", fields.time_text)?;
        writeln!(
            out,
            "status    {}",
            self.paint(&status.name().to_uppercase(), status_color(status))
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn banner_commands(banner: Banner, category: &CategoryFilter) -> Vec<String> {
    let scope = match category {
        CategoryFilter::Only(cat) => format!(" --category {}", cat.name().to_lowercase()),
        CategoryFilter::All | CategoryFilter::Unrecognized(_) => String::new(),
    };
    banner
        .targets()
        .into_iter()
        .map(|target| format!("taskdue list{scope} --status {}", target.label().to_lowercase()))
        .collect()
}

fn status_color(status: Status) -> &'static str {
    match status {
        Status::Completed => "32",
        Status::Pending => "33",
        Status::Failed => "31",
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use clap::Parser;

    use super::{EMPTY_LIST_MESSAGE, Renderer, strip_ansi};
    use crate::cli::{Command, GlobalCli};
    use crate::filter::{CategoryFilter, StatusFilter};
    use crate::summary::summarize;
    use crate::task::{Category, Status, Task};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .expect("valid now")
    }

    fn render_for(category: &CategoryFilter, tasks: &[Task], visible: &[Task]) -> String {
        let summary = summarize(tasks, category, now());
        let mut buf = Vec::new();
        Renderer::plain()
            .write_task_view(&mut buf, category, &summary, visible, now())
            .expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    fn render(tasks: &[Task], visible: &[Task]) -> String {
        render_for(&CategoryFilter::All, tasks, visible)
    }

    #[test]
    fn table_shows_banner_and_uppercase_status() {
        let tasks = vec![
            Task::new(1, "late".to_string(), Category::Work, now() - Duration::hours(2)),
            Task::new(2, "soon".to_string(), Category::Others, now() + Duration::hours(2)),
        ];
        let text = render(&tasks, &tasks);

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("❗ 1 task failed and 1 pending."));
        assert_eq!(lines.next(), Some("  see: taskdue list --status failed"));
        assert_eq!(lines.next(), Some("  see: taskdue list --status pending"));
        assert_eq!(lines.next(), Some(""));
        assert!(text.contains("FAILED"));
        assert!(text.contains("PENDING"));
        assert!(text.contains("09/03/2024 06:00"));
        assert!(text.contains("Category"));
    }

    #[test]
    fn empty_view_prints_placeholder() {
        let tasks = vec![Task::new(
            1,
            "late".to_string(),
            Category::Work,
            now() - Duration::hours(2),
        )];
        let text = render(&tasks, &[]);
        assert!(text.starts_with("❗ 1 task failed."));
        assert!(text.trim_end().ends_with(EMPTY_LIST_MESSAGE));

        let nothing = render(&[], &[]);
        assert_eq!(nothing.trim_end(), EMPTY_LIST_MESSAGE);
    }

    #[test]
    fn banner_commands_keep_the_category_and_parse_back() {
        let tasks = vec![
            Task::new(1, "late".to_string(), Category::Work, now() - Duration::hours(2)),
            Task::new(2, "soon".to_string(), Category::Others, now() + Duration::hours(2)),
        ];
        let work = CategoryFilter::Only(Category::Work);
        let text = render_for(&work, &tasks, &tasks[..1]);

        let hint = text
            .lines()
            .find_map(|line| line.strip_prefix("  see: "))
            .expect("hint line");
        assert_eq!(hint, "taskdue list --category work --status failed");
        assert_eq!(text.matches("  see: ").count(), 1);

        let cli = GlobalCli::try_parse_from(hint.split(' ')).expect("hint parses");
        assert_eq!(
            cli.command,
            Some(Command::List {
                category: work,
                status: StatusFilter::Only(Status::Failed),
            })
        );
    }

    #[test]
    fn completed_banner_has_no_follow_up() {
        let mut done = Task::new(1, "done".to_string(), Category::Work, now());
        done.completed = true;
        let text = render(std::slice::from_ref(&done), std::slice::from_ref(&done));
        assert!(text.starts_with("✅ All tasks completed!\n\n"));
        assert!(!text.contains("see:"));
    }

    #[test]
    fn strips_color_codes_for_width() {
        assert_eq!(strip_ansi("\x1b[31mFAILED\x1b[0m"), "FAILED");
    }
}
