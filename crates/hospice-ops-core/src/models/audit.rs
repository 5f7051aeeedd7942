//! Audit trail primitives shared by every editable record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Authenticated user a mutation runs on behalf of.
///
/// Supplied by the caller's session layer. The engine trusts it and performs
/// no authorization of its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    /// Stable user id
    pub id: String,
    /// Display name captured at mutation time
    pub name: String,
}

impl Actor {
    /// Create an actor.
    pub fn new(id: String, name: String) -> Self {
        Self { id, name }
    }
}

/// What kind of mutation an audit entry records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Record brought into existence
    Create,
    /// One or more fields changed
    Update,
}

/// One field-level change inside an audit entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    /// Field name as stored
    pub field: String,
    /// Value before the write, captured before the overwrite
    pub old_value: Value,
    /// Value after the write
    pub new_value: Value,
    /// Reviewer comment riding on this change
    pub comment: Option<String>,
}

impl FieldChange {
    /// Create a change with no comment.
    pub fn new(field: &str, old_value: Value, new_value: Value) -> Self {
        Self {
            field: field.to_string(),
            old_value,
            new_value,
            comment: None,
        }
    }
}

/// An immutable audit entry.
///
/// The same entry value is recorded at every scope a mutation touches, so a
/// leaf change can be read off the aggregate root without walking the tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    /// Unique entry id, shared by every copy of this entry
    pub entry_id: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// Id of the actor who made the change
    pub actor_id: String,
    /// Name of the actor who made the change
    pub actor_name: String,
    /// Kind of mutation
    pub action: AuditAction,
    /// Field-level changes; empty for creation entries
    pub changes: Vec<FieldChange>,
}

impl AuditEntry {
    /// Build an entry stamped with a fresh id and the current time.
    pub fn new(actor: &Actor, action: AuditAction, changes: Vec<FieldChange>) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            actor_id: actor.id.clone(),
            actor_name: actor.name.clone(),
            action,
            changes,
        }
    }
}

/// Per-record audit trail, newest entry first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditLog(Vec<AuditEntry>);

impl AuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Record an entry at the front so stored order is display order.
    pub fn record(&mut self, entry: AuditEntry) {
        self.0.insert(0, entry);
    }

    /// All entries, newest first.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.0
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&AuditEntry> {
        self.0.first()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the log has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
