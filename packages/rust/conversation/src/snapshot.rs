//! Profile snapshots written to the log directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use execadvisor_shared::{ExecAdvisorError, Language, ProgramTier, Result};

use crate::state::ConversationState;

/// Point-in-time view of a session's extracted profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub user_id: String,
    pub name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub experience_years: Option<u32>,
    pub leadership_years: Option<u32>,
    pub field: Option<String>,
    pub interest: Option<String>,
    pub suggested_program: Option<ProgramTier>,
    pub handover: bool,
    pub user_language: Option<Language>,
    pub program_interest: Vec<ProgramTier>,
}

impl ProfileSnapshot {
    pub fn capture(state: &ConversationState) -> Self {
        Self::capture_at(state, Utc::now())
    }

    pub fn capture_at(state: &ConversationState, timestamp: DateTime<Utc>) -> Self {
        let profile = &state.profile;
        Self {
            user_id: state.user_id.clone(),
            name: profile.user_name.clone(),
            timestamp,
            experience_years: profile.experience_years,
            leadership_years: profile.leadership_years,
            field: profile.field.clone(),
            interest: profile.interest.clone(),
            suggested_program: state.suggested_program,
            handover: state.handover_requested,
            user_language: state.user_language,
            program_interest: profile.program_interest.clone(),
        }
    }

    /// `profile_{user_id}_{timestamp}.json` with a filesystem-safe timestamp.
    pub fn file_name(&self) -> String {
        let user: String = self
            .user_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!(
            "profile_{user}_{}.json",
            self.timestamp.format("%Y%m%dT%H%M%S%.3fZ")
        )
    }
}

/// Writes snapshots as JSON files under a directory.
#[derive(Debug, Clone)]
pub struct ProfileLogger {
    dir: PathBuf,
}

impl ProfileLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one snapshot and return its path.
    pub fn write(&self, snapshot: &ProfileSnapshot) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ExecAdvisorError::io(&self.dir, e))?;
        let path = self.dir.join(snapshot.file_name());
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| ExecAdvisorError::Conversion(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| ExecAdvisorError::io(&path, e))?;
        debug!(path = %path.display(), "wrote profile snapshot");
        Ok(path)
    }

    /// Write a snapshot without waiting for it or reporting failure.
    ///
    /// Runs on the blocking pool when a tokio runtime is available.
    pub fn log_detached(&self, snapshot: ProfileSnapshot) {
        let logger = self.clone();
        let write = move || {
            if let Err(e) = logger.write(&snapshot) {
                warn!(user_id = %snapshot.user_id, error = %e, "failed to write profile snapshot");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }
}
