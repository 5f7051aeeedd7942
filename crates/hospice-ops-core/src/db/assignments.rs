//! QA assignment database operations.

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{Database, DbError, DbResult};
use crate::engine::store::{AggregateStore, StoreError, StoreResult};
use crate::models::QaAssignment;

impl Database {
    /// Insert a new assignment.
    pub fn insert_assignment(&self, assignment: &QaAssignment) -> DbResult<()> {
        let roles_json = serde_json::to_string(&assignment.assigned_roles)?;
        let reviews_json = serde_json::to_string(&assignment.reviews)?;
        let audit_log_json = serde_json::to_string(&assignment.audit_log)?;

        self.conn.execute(
            r#"
            INSERT INTO qa_assignments (
                assignment_id, facility_id, facility_name, month, year,
                assigned_roles, reviews, audit_log,
                active_count, discharged_count, visit_volume,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                assignment.assignment_id,
                assignment.facility_id,
                assignment.facility_name,
                assignment.month,
                assignment.year,
                roles_json,
                reviews_json,
                audit_log_json,
                assignment.active_count,
                assignment.discharged_count,
                assignment.visit_volume,
                assignment.created_at,
                assignment.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update a stored assignment from its in-memory state. The row keeps the
    /// model's updated_at so the stored value matches what the caller holds.
    pub fn update_assignment(&self, assignment: &QaAssignment) -> DbResult<bool> {
        let roles_json = serde_json::to_string(&assignment.assigned_roles)?;
        let reviews_json = serde_json::to_string(&assignment.reviews)?;
        let audit_log_json = serde_json::to_string(&assignment.audit_log)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE qa_assignments SET
                facility_id = ?2,
                facility_name = ?3,
                month = ?4,
                year = ?5,
                assigned_roles = ?6,
                reviews = ?7,
                audit_log = ?8,
                active_count = ?9,
                discharged_count = ?10,
                visit_volume = ?11,
                updated_at = ?12
            WHERE assignment_id = ?1
            "#,
            params![
                assignment.assignment_id,
                assignment.facility_id,
                assignment.facility_name,
                assignment.month,
                assignment.year,
                roles_json,
                reviews_json,
                audit_log_json,
                assignment.active_count,
                assignment.discharged_count,
                assignment.visit_volume,
                assignment.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Update an assignment and record its mutation token as one atomic unit.
    pub fn update_assignment_with_token(
        &self,
        assignment: &QaAssignment,
        token: &str,
    ) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        self.record_token(token, &assignment.assignment_id)?;
        let updated = self.update_assignment(assignment)?;
        if updated {
            tx.commit()?;
        }
        Ok(updated)
    }

    /// Get an assignment by ID.
    pub fn get_assignment(&self, assignment_id: &str) -> DbResult<Option<QaAssignment>> {
        self.conn
            .query_row(
                r#"
                SELECT assignment_id, facility_id, facility_name, month, year,
                       assigned_roles, reviews, audit_log,
                       active_count, discharged_count, visit_volume,
                       created_at, updated_at
                FROM qa_assignments
                WHERE assignment_id = ?
                "#,
                [assignment_id],
                |row| {
                    Ok(AssignmentRow {
                        assignment_id: row.get(0)?,
                        facility_id: row.get(1)?,
                        facility_name: row.get(2)?,
                        month: row.get(3)?,
                        year: row.get(4)?,
                        assigned_roles: row.get(5)?,
                        reviews: row.get(6)?,
                        audit_log: row.get(7)?,
                        active_count: row.get(8)?,
                        discharged_count: row.get(9)?,
                        visit_volume: row.get(10)?,
                        created_at: row.get(11)?,
                        updated_at: row.get(12)?,
                    })
                },
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List assignment summary rows, newest cycle first. A facility id
    /// narrows the list; None covers every facility.
    pub fn list_assignment_summaries(
        &self,
        facility_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<AssignmentSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT assignment_id, facility_id, facility_name, month, year,
                   json_array_length(reviews) AS patient_count,
                   active_count, discharged_count, visit_volume, updated_at
            FROM qa_assignments
            WHERE (?1 IS NULL OR facility_id = ?1)
            ORDER BY year DESC, month DESC, facility_name ASC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;

        let rows = stmt.query_map(params![facility_id, limit, offset], |row| {
            Ok(AssignmentSummary {
                assignment_id: row.get(0)?,
                facility_id: row.get(1)?,
                facility_name: row.get(2)?,
                month: row.get(3)?,
                year: row.get(4)?,
                patient_count: row.get(5)?,
                active_count: row.get(6)?,
                discharged_count: row.get(7)?,
                visit_volume: row.get(8)?,
                updated_at: row.get(9)?,
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    /// Delete an assignment.
    pub fn delete_assignment(&self, assignment_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM qa_assignments WHERE assignment_id = ?",
            [assignment_id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// One row of the assignment list view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentSummary {
    pub assignment_id: String,
    pub facility_id: String,
    pub facility_name: String,
    pub month: u8,
    pub year: u16,
    /// Number of patient reviews on the assignment
    pub patient_count: u32,
    pub active_count: u32,
    pub discharged_count: u32,
    pub visit_volume: u32,
    pub updated_at: String,
}

/// Intermediate row struct for database mapping.
struct AssignmentRow {
    assignment_id: String,
    facility_id: String,
    facility_name: String,
    month: u8,
    year: u16,
    assigned_roles: String,
    reviews: String,
    audit_log: String,
    active_count: u32,
    discharged_count: u32,
    visit_volume: u32,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AssignmentRow> for QaAssignment {
    type Error = DbError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(QaAssignment {
            assignment_id: row.assignment_id,
            facility_id: row.facility_id,
            facility_name: row.facility_name,
            month: row.month,
            year: row.year,
            assigned_roles: serde_json::from_str(&row.assigned_roles)?,
            reviews: serde_json::from_str(&row.reviews)?,
            audit_log: serde_json::from_str(&row.audit_log)?,
            active_count: row.active_count,
            discharged_count: row.discharged_count,
            visit_volume: row.visit_volume,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl AggregateStore<QaAssignment> for Database {
    fn load(&self, id: &str) -> StoreResult<Option<QaAssignment>> {
        Ok(self.get_assignment(id)?)
    }

    fn insert(&self, aggregate: &QaAssignment) -> StoreResult<()> {
        Ok(self.insert_assignment(aggregate)?)
    }

    fn save(&self, aggregate: &QaAssignment) -> StoreResult<()> {
        if !self.update_assignment(aggregate)? {
            return Err(StoreError::Backend(format!(
                "assignment {} vanished during save",
                aggregate.assignment_id
            )));
        }
        Ok(())
    }

    fn save_with_token(&self, aggregate: &QaAssignment, token: &str) -> StoreResult<()> {
        if !self.update_assignment_with_token(aggregate, token)? {
            return Err(StoreError::Backend(format!(
                "assignment {} vanished during save",
                aggregate.assignment_id
            )));
        }
        Ok(())
    }

    fn token_seen(&self, token: &str) -> StoreResult<bool> {
        Ok(self.token_applied(token)?)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.delete_assignment(id)?)
    }
}
