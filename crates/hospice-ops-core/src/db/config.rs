//! Facility column configuration database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::config::EnabledColumns;

impl Database {
    /// Store the enabled requirement columns for a facility.
    pub fn set_enabled_columns(
        &self,
        facility_id: &str,
        columns: &EnabledColumns,
    ) -> DbResult<()> {
        let ids: Vec<&str> = columns.ids().collect();
        let json = serde_json::to_string(&ids)?;

        self.conn.execute(
            r#"
            INSERT INTO facility_config (facility_id, enabled_columns)
            VALUES (?1, ?2)
            ON CONFLICT(facility_id) DO UPDATE SET enabled_columns = excluded.enabled_columns
            "#,
            params![facility_id, json],
        )?;
        Ok(())
    }

    /// Get the enabled requirement columns for a facility. A facility with
    /// no stored override sees the full catalog; ids no longer in the
    /// catalog are dropped on read.
    pub fn enabled_columns(&self, facility_id: &str) -> DbResult<EnabledColumns> {
        let stored: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT enabled_columns FROM facility_config WHERE facility_id = ?",
                [facility_id],
                |row| row.get(0),
            )
            .optional()?;

        match stored.flatten() {
            Some(json) => {
                let ids: Vec<String> = serde_json::from_str(&json)?;
                Ok(EnabledColumns::subset(ids))
            }
            None => Ok(EnabledColumns::all()),
        }
    }

    /// Drop a facility's column override, restoring the full catalog.
    pub fn clear_enabled_columns(&self, facility_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM facility_config WHERE facility_id = ?",
            [facility_id],
        )?;
        Ok(rows_affected > 0)
    }
}
