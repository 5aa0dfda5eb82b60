//! TUI rendering traits for famsync types.
//!
//! This module provides extension traits that add colored terminal rendering
//! to famsync-core types using owo_colors.

use famsync_core::diff::{ChildDiff, DiffKind, EventDiff};
use famsync_core::event::{CalendarId, SyncedEvent};
use famsync_core::summary::{ChildStatus, ChildSummary};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for DiffKind {
    fn render(&self) -> String {
        let symbol = self.symbol();
        match self {
            DiffKind::Create => symbol.green().to_string(),
            DiffKind::Update => symbol.yellow().to_string(),
            DiffKind::Delete => symbol.red().to_string(),
        }
    }
}

/// Colorize text according to the diff kind
fn colorize_diff(kind: DiffKind, text: &str) -> String {
    match kind {
        DiffKind::Create => text.green().to_string(),
        DiffKind::Update => text.yellow().to_string(),
        DiffKind::Delete => text.red().to_string(),
    }
}

fn render_event_time(event: &SyncedEvent) -> String {
    format!(
        "{} → {}",
        event.start.format("%Y-%m-%d %H:%M"),
        event.end.format("%H:%M UTC")
    )
}

impl Render for EventDiff {
    fn render(&self) -> String {
        let kind = self.kind();
        let event = self.event();
        let title = colorize_diff(kind, &event.to_string());
        let origin = format!("from {}", event.origin.parent);

        format!(
            "{} {} {} {}",
            kind.render(),
            title,
            render_event_time(event).dimmed(),
            origin.dimmed()
        )
    }
}

impl Render for CalendarId {
    fn render(&self) -> String {
        format!("📅 {}", self)
    }
}

impl Render for ChildStatus {
    fn render(&self) -> String {
        match self {
            ChildStatus::Completed => "done".green().to_string(),
            ChildStatus::CompletedWithErrors => "done with errors".yellow().to_string(),
            ChildStatus::Skipped => "skipped".red().to_string(),
            ChildStatus::Failed => "failed".red().to_string(),
            ChildStatus::Cancelled => "cancelled".yellow().to_string(),
        }
    }
}

/// Threshold for compact view (show counts instead of individual events)
const COMPACT_THRESHOLD: usize = 5;

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

/// Render a list of diffs, using compact view if there are many events and verbose is false
fn render_diff_list(diffs: &[EventDiff], verbose: bool, lines: &mut Vec<String>) {
    if verbose || diffs.len() <= COMPACT_THRESHOLD {
        for diff in diffs {
            lines.push(format!("   {}", diff.render()));
            lines.extend(
                render_field_diffs(diff)
                    .into_iter()
                    .map(|l| format!("      {}", l)),
            );
        }
    } else {
        let count = |kind: DiffKind| diffs.iter().filter(|d| d.kind() == kind).count();
        let creates = count(DiffKind::Create);
        let updates = count(DiffKind::Update);
        let deletes = count(DiffKind::Delete);

        if creates > 0 {
            let label = format!("({} new {})", creates, pluralize("event", creates));
            lines.push(format!("   {} {}", "+".green(), label.green()));
        }
        if updates > 0 {
            let label = format!("({} changed {})", updates, pluralize("event", updates));
            lines.push(format!("   {} {}", "~".yellow(), label.yellow()));
        }
        if deletes > 0 {
            let label = format!("({} removed {})", deletes, pluralize("event", deletes));
            lines.push(format!("   {} {}", "-".red(), label.red()));
        }
    }
}

/// Field-by-field differences, for updates only
fn render_field_diffs(diff: &EventDiff) -> Vec<String> {
    let EventDiff::Update { old, new } = diff else {
        return Vec::new();
    };
    let old = &old.event;
    let mut lines = Vec::new();

    if old.title != new.title {
        lines.push(format!("{}: {} → {}", "title".dimmed(), old.title.red(), new.title.green()));
    }
    if old.start != new.start {
        lines.push(format!(
            "{}: {} → {}",
            "start".dimmed(),
            old.start.to_string().red(),
            new.start.to_string().green()
        ));
    }
    if old.end != new.end {
        lines.push(format!(
            "{}: {} → {}",
            "end".dimmed(),
            old.end.to_string().red(),
            new.end.to_string().green()
        ));
    }
    if old.description != new.description {
        lines.push(render_optional_diff("description", &old.description, &new.description));
    }
    if old.location != new.location {
        lines.push(render_optional_diff("location", &old.location, &new.location));
    }

    lines
}

fn render_optional_diff(field: &str, old: &Option<String>, new: &Option<String>) -> String {
    let old_str = old.as_deref().unwrap_or("(none)");
    let new_str = new.as_deref().unwrap_or("(none)");
    format!("{}: {} → {}", field.dimmed(), old_str.red(), new_str.green())
}

pub trait ChildDiffRender {
    fn render(&self, verbose: bool) -> String;
}

impl ChildDiffRender for ChildDiff {
    fn render(&self, verbose: bool) -> String {
        if self.is_empty() {
            return "   No changes".dimmed().to_string();
        }

        let mut lines = Vec::new();
        render_diff_list(&self.diffs, verbose, &mut lines);
        lines.join("\n")
    }
}

pub trait ChildSummaryRender {
    fn render_summary(&self, verbose: bool) -> String;
}

impl ChildSummaryRender for ChildSummary {
    fn render_summary(&self, verbose: bool) -> String {
        let mut lines = Vec::new();

        if self.operations() == 0 && self.failures.is_empty() {
            lines.push(format!("   {} {}", "No changes".dimmed(), self.status.render()));
        } else {
            lines.push(format!(
                "   {} created, {} updated, {} deleted {}",
                self.created,
                self.updated,
                self.deleted,
                self.status.render()
            ));
        }

        if verbose && self.unchanged > 0 {
            lines.push(format!("   {} unchanged", self.unchanged).dimmed().to_string());
        }

        for failure in &self.failures {
            let context = match (&failure.operation, &failure.parent, &failure.source_event_id) {
                (Some(op), Some(parent), Some(id)) => format!("{op} {parent}/{id}: "),
                (None, Some(parent), _) => format!("{parent}: "),
                _ => String::new(),
            };
            lines.push(format!("   {}{}", context.dimmed(), failure.error.to_string().red()));
        }

        lines.join("\n")
    }
}
