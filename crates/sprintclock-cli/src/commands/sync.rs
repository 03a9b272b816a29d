use clap::Subcommand;
use sprintclock_core::identity::clear_session_key_at;
use sprintclock_core::storage::data_dir;
use sprintclock_core::{Config, SyncError};

use super::{open_session, CliResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Show the session key and last seen revision
    Status,
    /// Apply state written by another session, if any
    Pull,
    /// Write the current state to the store
    Push,
    /// Detach from the store and forget the generated session key
    Clear,
}

pub fn run(action: SyncAction, user: Option<&str>) -> CliResult {
    let config = Config::load_or_default();
    let mut session = open_session(user, &config)?;

    match action {
        SyncAction::Status => {
            println!("{}", serde_json::to_string_pretty(&session.status())?);
        }
        SyncAction::Pull => {
            let applied = session.poll_remote()?;
            println!(
                "{}",
                serde_json::json!({ "applied": applied, "revision": session.status().revision })
            );
        }
        SyncAction::Push => {
            if !session.is_initialized() {
                return Err(SyncError::Unavailable("sync is not initialized".into()).into());
            }
            session.save_state()?;
            println!("{}", serde_json::to_string_pretty(&session.status())?);
        }
        SyncAction::Clear => {
            session.clear_sync();
            let removed = clear_session_key_at(&data_dir()?)?;
            println!("{}", serde_json::json!({ "cleared": true, "keyRemoved": removed }));
        }
    }
    Ok(())
}
