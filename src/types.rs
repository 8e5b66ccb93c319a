//! Core types and events

use serde::{Deserialize, Serialize};

/// Unique identifier for a sync credential (an external board account)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(pub i64);

impl CredentialId {
    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for CredentialId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one dependency scope, unique within the process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(pub u64);

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Stage of a sync pipeline run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    /// Checking and taking the single-flight guard
    Guarding,
    /// Fetching the board's lists
    Fetching,
    /// Classifying lists and creating content
    Dispatching,
    /// Clearing the syncing flag
    Releasing,
}

impl std::fmt::Display for SyncStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStage::Guarding => "guarding",
            SyncStage::Fetching => "fetching",
            SyncStage::Dispatching => "dispatching",
            SyncStage::Releasing => "releasing",
        };
        f.write_str(s)
    }
}

/// Counts of what a sync run created
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Courses created
    pub courses: u32,
    /// Sections created
    pub sections: u32,
    /// Lessons created
    pub lessons: u32,
    /// Items created across all lessons
    pub lesson_items: u32,
    /// Quizzes created
    pub quizzes: u32,
    /// Questions created across all quizzes
    pub questions: u32,
    /// Attachments downloaded and stored
    pub attachments: u32,
    /// Lists skipped because they carried no recognized tag
    pub skipped_lists: u32,
}

/// Event emitted by the executor and the sync pipeline
///
/// Consumers subscribe through [`CourseSync::subscribe`](crate::CourseSync::subscribe).
/// Failures of queued work are only observable here and in the logs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A queued work item finished successfully
    WorkCompleted {
        /// Scope the item ran in
        scope: ScopeId,
    },

    /// A queued work item failed; the consumer loop continued
    WorkFailed {
        /// Scope the item ran in
        scope: ScopeId,
        /// Error message
        error: String,
    },

    /// A sync run took the guard and started fetching
    SyncStarted {
        /// Credential being synced
        credential: CredentialId,
        /// External board identifier
        board_id: String,
    },

    /// A sync run finished
    SyncCompleted {
        /// Credential that was synced
        credential: CredentialId,
        /// What the run created
        report: SyncReport,
    },

    /// A sync run failed after releasing its guard
    SyncFailed {
        /// Credential that was synced
        credential: CredentialId,
        /// Stage that failed
        stage: SyncStage,
        /// Error message
        error: String,
    },

    /// The host is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_id_serializes_transparently() {
        let json = serde_json::to_string(&CredentialId(42)).unwrap_or_default();
        assert_eq!(json, "42");
    }

    #[test]
    fn event_is_tagged() {
        let event = Event::SyncFailed {
            credential: CredentialId(1),
            stage: SyncStage::Dispatching,
            error: "boom".into(),
        };
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["type"], "sync_failed");
        assert_eq!(json["stage"], "dispatching");
    }
}
