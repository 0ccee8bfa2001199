use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Local, NaiveDate};
use taskpad_shared::{Task, TaskPriority, TaskStatus, User};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::views::{AdminData, StatusCounts};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn print_task_table(&mut self, tasks: &[&Task], counts: StatusCounts) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let today = Local::now().date_naive();

        let headers = ["ID", "Status", "Pri", "Due", "Title"].map(String::from).to_vec();
        let rows = tasks
            .iter()
            .map(|task| {
                vec![
                    self.paint(&task.id.to_string(), "33"),
                    self.status_cell(task.status),
                    self.priority_cell(task.priority),
                    self.due_cell(task.due_date, task.status, today),
                    task.title.clone(),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        writeln!(
            out,
            "\n{} shown, {} total ({} pending, {} in progress, {} completed)",
            tasks.len(),
            counts.total(),
            counts.pending,
            counts.in_progress,
            counts.completed
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&mut self, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        writeln!(out, "status    {}", task.status.label())?;
        writeln!(out, "priority  {}", task.priority)?;
        writeln!(out, "desc      {}", task.description.as_deref().unwrap_or_default())?;
        if let Some(due) = task.due_date {
            writeln!(out, "due       {}", due.format("%Y-%m-%d"))?;
        }
        writeln!(
            out,
            "created   {}",
            task.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        )?;

        Ok(())
    }

    pub fn print_user(&mut self, user: &User) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{} <{}> [{}] id={}", user.name, user.email, user.role.as_str(), user.id)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, users))]
    pub fn print_user_table(&mut self, users: &[User]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let headers = ["ID", "Name", "Email", "Role"].map(String::from).to_vec();
        let rows = users
            .iter()
            .map(|user| {
                let role = if user.is_admin() {
                    self.paint(user.role.as_str(), "35")
                } else {
                    user.role.as_str().to_string()
                };
                vec![user.id.to_string(), user.name.clone(), user.email.clone(), role]
            })
            .collect();
        write_table(&mut out, headers, rows)
    }

    #[tracing::instrument(skip(self, data))]
    pub fn print_admin_tasks(&mut self, data: &AdminData) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let today = Local::now().date_naive();
        let headers = ["ID", "Owner", "Status", "Pri", "Due", "Title"].map(String::from).to_vec();
        let rows = data
            .tasks
            .iter()
            .map(|task| {
                let owner = data
                    .owner_of(task)
                    .map(|user| user.email.clone())
                    .unwrap_or_else(|| format!("#{}", task.user_id));
                vec![
                    self.paint(&task.id.to_string(), "33"),
                    owner,
                    self.status_cell(task.status),
                    self.priority_cell(task.priority),
                    self.due_cell(task.due_date, task.status, today),
                    task.title.clone(),
                ]
            })
            .collect();
        write_table(&mut out, headers, rows)
    }

    fn status_cell(&self, status: TaskStatus) -> String {
        match status {
            TaskStatus::Completed => self.paint(status.label(), "32"),
            TaskStatus::InProgress => self.paint(status.label(), "36"),
            TaskStatus::Pending => status.label().to_string(),
        }
    }

    fn priority_cell(&self, priority: TaskPriority) -> String {
        match priority {
            TaskPriority::High => self.paint(priority.as_str(), "31"),
            _ => priority.as_str().to_string(),
        }
    }

    fn due_cell(&self, due: Option<NaiveDate>, status: TaskStatus, today: NaiveDate) -> String {
        let Some(due) = due else {
            return String::new();
        };
        let text = due.format("%Y-%m-%d").to_string();
        if due < today && status != TaskStatus::Completed {
            self.paint(&text, "31")
        } else {
            text
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(mut writer: W, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
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

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ", width = *width)?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
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
    use super::*;

    #[test]
    fn table_pads_by_visible_width() {
        let mut buf = Vec::new();
        write_table(
            &mut buf,
            vec!["ID".to_string(), "Title".to_string()],
            vec![
                vec!["\x1b[33m1\x1b[0m".to_string(), "Café".to_string()],
                vec!["12".to_string(), "x".to_string()],
            ],
        )
        .expect("table");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID Title ");
        assert_eq!(lines[1], "-- ----- ");
        assert_eq!(lines[2], "\x1b[33m1\x1b[0m  Café  ");
        assert_eq!(lines[3], "12 x     ");
    }
}
