//! Command-line front end
//!
//! This module organizes commands into logical submodules:
//! - `reminders`: reminder CRUD, listing and manual reconciliation
//! - `settings`: application settings

pub mod reminders;
pub mod settings;

use crate::app::AppState;
use crate::error::Result;
use clap::Subcommand;

pub use reminders::{AddArgs, DueArgs, EditArgs, ListArgs, RelativeOffset};
pub use settings::SettingsAction;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create a reminder
    Add(AddArgs),
    /// Edit a reminder (any field, including status)
    Edit(EditArgs),
    /// List reminders grouped by status
    List(ListArgs),
    /// Show one reminder
    Show { id: String },
    /// Mark a reminder as finished
    Finish { id: String },
    /// Delete a reminder
    Delete { id: String },
    /// Bring every reminder's status up to date
    Reconcile,
    /// Stay running: deliver notifications and reconcile periodically
    Run,
    /// Application settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

impl Command {
    /// Whether the command keeps the process alive and needs real timers
    pub fn is_long_running(&self) -> bool {
        matches!(self, Command::Run)
    }
}

/// Execute a one-shot command. `Run` is handled by the caller.
pub async fn dispatch(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Add(args) => reminders::add(state, args).await,
        Command::Edit(args) => reminders::edit(state, args).await,
        Command::List(args) => reminders::list(state, args).await,
        Command::Show { id } => reminders::show(state, &id).await,
        Command::Finish { id } => reminders::finish(state, &id).await,
        Command::Delete { id } => reminders::delete(state, &id).await,
        Command::Reconcile => reminders::reconcile(state).await,
        Command::Settings { action } => settings::run(state, action).await,
        Command::Run => {
            tracing::warn!("'run' is handled by the binary entry point");
            Ok(())
        }
    }
}
