// Output formatting utilities

use crate::board::{Column, DragId, Notice, NoticeLevel, Notifier};
use crate::models::{Lead, LeadNote, Stage};
use chrono::{Local, TimeZone};
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_RESET: &str = "\x1b[0m";
const ANSI_FG_GREEN: &str = "\x1b[32m";
const ANSI_FG_RED: &str = "\x1b[31m";
const ANSI_FG_BRIGHT_BLACK: &str = "\x1b[90m";

/// Prints board notifications: successes to stdout, errors to stderr
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => println!("{}", notice.message),
            NoticeLevel::Error => eprintln!("Error: {}", notice.message),
        }
    }
}

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

fn paint(text: &str, code: &str, tty: bool) -> String {
    if tty {
        format!("{}{}{}", code, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Truncate to `width` characters, marking the cut with "…"
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}

/// Format a unix timestamp as a local date
pub fn format_date(ts: i64) -> String {
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn lead_contact(lead: &Lead) -> String {
    [lead.email.as_deref(), lead.phone.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the board as one section per stage column
pub fn format_board(columns: &[Column<'_>], width: usize, tty: bool) -> String {
    let mut out = String::new();
    let id_width = columns
        .iter()
        .flat_map(|c| c.leads.iter())
        .map(|l| l.id.to_string().len())
        .max()
        .unwrap_or(1);

    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let marker = if column.stage.is_default { " *" } else { "" };
        let header = format!("{} ({}){}", column.stage.title, column.leads.len(), marker);
        out.push_str(&paint(&header, ANSI_BOLD, tty));
        out.push_str(&paint(&format!("  [{}]", DragId::stage(&column.stage.stage_id)), ANSI_FG_BRIGHT_BLACK, tty));
        out.push('\n');

        if column.leads.is_empty() {
            out.push_str(&paint("  (empty)", ANSI_DIM, tty));
            out.push('\n');
            continue;
        }

        for lead in &column.leads {
            let contact = lead_contact(lead);
            let line = if contact.is_empty() {
                format!("  {:>w$}  {}  [{}]", lead.id, lead.full_name, lead.status.as_str(), w = id_width)
            } else {
                format!(
                    "  {:>w$}  {}  [{}]  {}",
                    lead.id,
                    lead.full_name,
                    lead.status.as_str(),
                    contact,
                    w = id_width
                )
            };
            out.push_str(&truncate(&line, width));
            out.push('\n');
        }
    }
    out
}

/// Render the stage list in board order
pub fn format_stage_list(stages: &[Stage], tty: bool) -> String {
    let key_width = stages.iter().map(|s| s.stage_id.len()).max().unwrap_or(3).max(3);
    let mut out = String::new();
    out.push_str(&paint(
        &format!("{:<4} {:<kw$} {}", "Pos", "Key", "Title", kw = key_width),
        ANSI_BOLD,
        tty,
    ));
    out.push('\n');
    for stage in stages {
        let default = if stage.is_default { "  (default)" } else { "" };
        out.push_str(&format!(
            "{:<4} {:<kw$} {}{}\n",
            stage.position,
            stage.stage_id,
            stage.title,
            default,
            kw = key_width
        ));
    }
    out
}

/// Render a lead table; `stage_title` resolves stage keys for display
pub fn format_lead_table<'a>(
    leads: &[&'a Lead],
    stage_title: impl Fn(&'a str) -> &'a str,
    width: usize,
    tty: bool,
) -> String {
    if leads.is_empty() {
        return "No leads found.\n".to_string();
    }

    let id_w = leads.iter().map(|l| l.id.to_string().len()).max().unwrap_or(2).max(2);
    let name_w = leads.iter().map(|l| l.full_name.chars().count()).max().unwrap_or(4).clamp(4, 32);
    let stage_w = leads.iter().map(|l| stage_title(&l.stage).chars().count()).max().unwrap_or(5).max(5);

    let mut out = String::new();
    let header = format!(
        "{:<id_w$}  {:<name_w$}  {:<stage_w$}  {:<9}  {:<10}  {}",
        "ID", "Name", "Stage", "Status", "Created", "Contact",
    );
    out.push_str(&paint(&truncate(&header, width), ANSI_BOLD, tty));
    out.push('\n');

    for lead in leads {
        let line = format!(
            "{:<id_w$}  {:<name_w$}  {:<stage_w$}  {:<9}  {:<10}  {}",
            lead.id,
            truncate(&lead.full_name, name_w),
            stage_title(&lead.stage),
            lead.status.as_str(),
            format_date(lead.created_ts),
            lead_contact(lead),
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Render a lead's activity notes
pub fn format_history(lead: &Lead, notes: &[LeadNote], tty: bool) -> String {
    let mut out = String::new();
    out.push_str(&paint(&format!("Lead {}: {}", lead.id, lead.full_name), ANSI_BOLD, tty));
    out.push('\n');
    if notes.is_empty() {
        out.push_str("  No activity recorded.\n");
        return out;
    }
    for note in notes {
        out.push_str(&format!("  {}  {}\n", format_date(note.created_ts), note.note));
    }
    out
}

/// Outcome line for a settled optimistic change
pub fn format_rollback(tty: bool) -> String {
    paint("Change was reverted.", ANSI_FG_RED, tty)
}

pub fn format_ok(text: &str, tty: bool) -> String {
    paint(text, ANSI_FG_GREEN, tty)
}
