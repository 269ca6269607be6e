//! Reminder commands
//!
//! CRUD operations and listing for the command-line front end.

use crate::app::AppState;
use crate::config::DEFAULT_DUE_OFFSET_SECS;
use crate::database::{
    CreateReminderRequest, LeadTime, Reminder, ReminderStatus, UpdateReminderRequest,
};
use crate::error::{AppError, Result};
use crate::lifecycle::{self, ProgressBand};
use crate::notifications::ScheduleOutcome;
use crate::services::SavedReminder;
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use std::str::FromStr;

/// Due time relative to now: "<number><unit>" with unit m, h, d or w
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeOffset(Duration);

impl RelativeOffset {
    pub fn duration(self) -> Duration {
        self.0
    }
}

impl FromStr for RelativeOffset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        let Some(unit) = s.chars().last() else {
            return Err("Empty offset string".to_string());
        };
        let number_part = &s[..s.len() - unit.len_utf8()];

        let value: i64 = number_part
            .parse()
            .map_err(|_| format!("Invalid number in offset: {}", s))?;

        if value <= 0 {
            return Err("Offset must be greater than 0".to_string());
        }

        let duration = match unit {
            'm' => Duration::try_minutes(value),
            'h' => Duration::try_hours(value),
            'd' => Duration::try_days(value),
            'w' => Duration::try_weeks(value),
            _ => {
                return Err(format!(
                    "Invalid offset unit '{}'. Use 'm' (minutes), 'h' (hours), 'd' (days) or 'w' (weeks)",
                    unit
                ))
            }
        };

        duration
            .map(RelativeOffset)
            .ok_or_else(|| format!("Offset too large: {}", s))
    }
}

/// When a reminder is due: absolute or relative to now
#[derive(Debug, Clone, Args)]
pub struct DueArgs {
    /// Due time as RFC 3339, e.g. 2025-03-01T09:00:00Z
    #[arg(long, conflicts_with = "due_in")]
    pub due: Option<DateTime<Utc>>,

    /// Due time relative to now, e.g. 30m, 2h, 3d, 1w
    #[arg(long = "in", value_name = "OFFSET")]
    pub due_in: Option<RelativeOffset>,
}

impl DueArgs {
    /// `Ok(None)` when neither flag was given
    fn resolve(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        if let Some(due) = self.due {
            return Ok(Some(due));
        }

        match self.due_in {
            Some(offset) => now
                .checked_add_signed(offset.duration())
                .map(Some)
                .ok_or_else(|| AppError::Validation("Offset too large".to_string())),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    pub title: String,

    #[arg(long)]
    pub notes: Option<String>,

    #[command(flatten)]
    pub due: DueArgs,

    /// Lead time for the notification: hour, day or week
    #[arg(long)]
    pub notify: Option<LeadTime>,

    /// Initial status (defaults to Active)
    #[arg(long)]
    pub status: Option<ReminderStatus>,
}

#[derive(Debug, Clone, Args)]
pub struct EditArgs {
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    #[command(flatten)]
    pub due: DueArgs,

    #[arg(long)]
    pub notify: Option<LeadTime>,

    /// Manual status override
    #[arg(long)]
    pub status: Option<ReminderStatus>,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Create a new reminder
pub async fn add(state: &AppState, args: AddArgs) -> Result<()> {
    let now = state.clock.now();
    let settings = state.settings_service.get_reminders().await?;

    let due_at = args
        .due
        .resolve(now)?
        .unwrap_or_else(|| now + Duration::seconds(DEFAULT_DUE_OFFSET_SECS));

    let saved = state
        .reminders_service
        .create_reminder(CreateReminderRequest {
            title: args.title,
            notes: args.notes,
            due_at,
            notify_before: args.notify.unwrap_or(settings.default_notify_before),
            status: args.status,
        })
        .await?;

    println!("Created {}", saved.reminder.id);
    print_saved(&saved, now);
    Ok(())
}

/// Edit fields of an existing reminder
pub async fn edit(state: &AppState, args: EditArgs) -> Result<()> {
    let now = state.clock.now();
    let id = resolve_id(state, &args.id).await?;

    let saved = state
        .reminders_service
        .update_reminder(UpdateReminderRequest {
            id,
            title: args.title,
            notes: args.notes,
            due_at: args.due.resolve(now)?,
            status: args.status,
            notify_before: args.notify,
        })
        .await?;

    println!("Updated {}", saved.reminder.id);
    print_saved(&saved, now);
    Ok(())
}

/// List reminders grouped by status, after bringing statuses up to date
pub async fn list(state: &AppState, args: ListArgs) -> Result<()> {
    state.reconciler.reconcile_once().await?;
    let groups = state.reminders_service.list_grouped().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    let now = state.clock.now();
    let sections = [
        (ReminderStatus::Active, &groups.active),
        (ReminderStatus::Pending, &groups.pending),
        (ReminderStatus::Finished, &groups.finished),
    ];

    let mut printed = false;
    for (status, reminders) in sections {
        if reminders.is_empty() {
            continue;
        }
        println!("{}", status);
        for reminder in reminders {
            println!("  {}", summary_line(reminder, now));
        }
        printed = true;
    }

    if !printed {
        println!("No reminders");
    }
    Ok(())
}

/// Show one reminder in full
pub async fn show(state: &AppState, id: &str) -> Result<()> {
    state.reconciler.reconcile_once().await?;
    let id = resolve_id(state, id).await?;
    let reminder = state.reminders_service.get_reminder(&id).await?;
    let now = state.clock.now();

    println!("{}", reminder.title);
    if !reminder.notes.is_empty() {
        println!("  {}", reminder.notes);
    }
    println!("  id:       {}", reminder.id);
    println!("  status:   {}", reminder.status);
    println!("  due:      {}", reminder.due_at.format("%Y-%m-%d %H:%M UTC"));
    println!(
        "  notify:   {} before ({})",
        reminder.notify_before,
        lifecycle::notify_threshold(&reminder).format("%Y-%m-%d %H:%M UTC")
    );
    println!("  progress: {}", progress_text(&reminder, now));
    Ok(())
}

pub async fn finish(state: &AppState, id: &str) -> Result<()> {
    let id = resolve_id(state, id).await?;
    let reminder = state.reminders_service.finish_reminder(&id).await?;
    println!("Finished '{}'", reminder.title);
    Ok(())
}

pub async fn delete(state: &AppState, id: &str) -> Result<()> {
    let id = resolve_id(state, id).await?;
    state.reminders_service.delete_reminder(&id).await?;
    println!("Deleted {}", id);
    Ok(())
}

/// One reconciliation pass, as a manual refresh
pub async fn reconcile(state: &AppState) -> Result<()> {
    let report = state.reconciler.reconcile_once().await?;
    println!(
        "Checked {} reminder(s): {} updated, {} failed",
        report.examined, report.updated, report.failed
    );
    Ok(())
}

/// Accept a full id or a unique prefix of one
async fn resolve_id(state: &AppState, id: &str) -> Result<String> {
    if state.repo.find_reminder(id).await?.is_some() {
        return Ok(id.to_string());
    }

    let matches: Vec<String> = state
        .reminders_service
        .list_reminders()
        .await?
        .into_iter()
        .filter(|r| r.id.starts_with(id))
        .map(|r| r.id)
        .collect();

    match matches.as_slice() {
        [single] => Ok(single.clone()),
        [] => Err(AppError::ReminderNotFound(id.to_string())),
        _ => Err(AppError::Validation(format!("Id prefix '{}' is ambiguous", id))),
    }
}

fn print_saved(saved: &SavedReminder, now: DateTime<Utc>) {
    println!("  {}", summary_line(&saved.reminder, now));

    match saved.alert {
        Some(ScheduleOutcome::Armed { at }) => {
            println!("  notification at {}", at.format("%Y-%m-%d %H:%M UTC"))
        }
        Some(ScheduleOutcome::Skipped { reason }) => println!("  no notification: {}", reason),
        None => println!("  notification could not be scheduled"),
    }
}

fn summary_line(reminder: &Reminder, now: DateTime<Utc>) -> String {
    let short_id: String = reminder.id.chars().take(8).collect();
    format!(
        "{}  {}  due {}  {}",
        short_id,
        reminder.title,
        reminder.due_at.format("%b %d %H:%M"),
        progress_text(reminder, now)
    )
}

fn progress_text(reminder: &Reminder, now: DateTime<Utc>) -> String {
    let progress = lifecycle::progress(reminder, now);
    let marker = match ProgressBand::from_progress(progress) {
        ProgressBand::Early => "",
        ProgressBand::Midway => " !",
        ProgressBand::Late => " !!",
    };

    format!(
        "{:>3.0}%{} {}",
        progress * 100.0,
        marker,
        lifecycle::format_time_remaining(lifecycle::time_remaining(reminder, now))
    )
}
