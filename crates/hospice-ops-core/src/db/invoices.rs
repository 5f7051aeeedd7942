//! Invoice database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{Database, DbError, DbResult};
use crate::engine::store::{AggregateStore, StoreError, StoreResult};
use crate::models::{Invoice, InvoiceStatus};

impl Database {
    /// Insert a new invoice.
    pub fn insert_invoice(&self, invoice: &Invoice) -> DbResult<()> {
        let patients_json = serde_json::to_string(&invoice.patients)?;
        let audit_log_json = serde_json::to_string(&invoice.audit_log)?;
        let status_str = status_to_string(&invoice.status);

        self.conn.execute(
            r#"
            INSERT INTO invoices (
                invoice_id, invoice_number, facility_id, facility_name,
                staff_id, staff_name, period_start, period_end,
                status, total_amount, patients, audit_log,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                invoice.invoice_id,
                invoice.invoice_number,
                invoice.facility_id,
                invoice.facility_name,
                invoice.staff_id,
                invoice.staff_name,
                invoice.period_start.to_string(),
                invoice.period_end.to_string(),
                status_str,
                invoice.total_amount,
                patients_json,
                audit_log_json,
                invoice.created_at,
                invoice.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update a stored invoice from its in-memory state. The row keeps the
    /// model's updated_at so the stored value matches what the caller holds.
    pub fn update_invoice(&self, invoice: &Invoice) -> DbResult<bool> {
        let patients_json = serde_json::to_string(&invoice.patients)?;
        let audit_log_json = serde_json::to_string(&invoice.audit_log)?;
        let status_str = status_to_string(&invoice.status);

        let rows_affected = self.conn.execute(
            r#"
            UPDATE invoices SET
                invoice_number = ?2,
                facility_id = ?3,
                facility_name = ?4,
                staff_id = ?5,
                staff_name = ?6,
                period_start = ?7,
                period_end = ?8,
                status = ?9,
                total_amount = ?10,
                patients = ?11,
                audit_log = ?12,
                updated_at = ?13
            WHERE invoice_id = ?1
            "#,
            params![
                invoice.invoice_id,
                invoice.invoice_number,
                invoice.facility_id,
                invoice.facility_name,
                invoice.staff_id,
                invoice.staff_name,
                invoice.period_start.to_string(),
                invoice.period_end.to_string(),
                status_str,
                invoice.total_amount,
                patients_json,
                audit_log_json,
                invoice.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Update an invoice and record its mutation token as one atomic unit.
    pub fn update_invoice_with_token(&self, invoice: &Invoice, token: &str) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        self.record_token(token, &invoice.invoice_id)?;
        let updated = self.update_invoice(invoice)?;
        if updated {
            tx.commit()?;
        }
        Ok(updated)
    }

    /// Get an invoice by ID.
    pub fn get_invoice(&self, invoice_id: &str) -> DbResult<Option<Invoice>> {
        self.conn
            .query_row(
                r#"
                SELECT invoice_id, invoice_number, facility_id, facility_name,
                       staff_id, staff_name, period_start, period_end,
                       status, total_amount, patients, audit_log,
                       created_at, updated_at
                FROM invoices
                WHERE invoice_id = ?
                "#,
                [invoice_id],
                |row| {
                    Ok(InvoiceRow {
                        invoice_id: row.get(0)?,
                        invoice_number: row.get(1)?,
                        facility_id: row.get(2)?,
                        facility_name: row.get(3)?,
                        staff_id: row.get(4)?,
                        staff_name: row.get(5)?,
                        period_start: row.get(6)?,
                        period_end: row.get(7)?,
                        status: row.get(8)?,
                        total_amount: row.get(9)?,
                        patients: row.get(10)?,
                        audit_log: row.get(11)?,
                        created_at: row.get(12)?,
                        updated_at: row.get(13)?,
                    })
                },
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List invoice summary rows, newest period first. A facility id narrows
    /// the list; None covers every facility.
    pub fn list_invoice_summaries(
        &self,
        facility_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<InvoiceSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT invoice_id, invoice_number, facility_id, facility_name,
                   period_start, period_end, status, total_amount,
                   json_array_length(patients) AS patient_count, updated_at
            FROM invoices
            WHERE (?1 IS NULL OR facility_id = ?1)
            ORDER BY period_start DESC, invoice_number ASC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;

        let rows = stmt.query_map(params![facility_id, limit, offset], |row| {
            Ok(InvoiceSummaryRow {
                invoice_id: row.get(0)?,
                invoice_number: row.get(1)?,
                facility_id: row.get(2)?,
                facility_name: row.get(3)?,
                period_start: row.get(4)?,
                period_end: row.get(5)?,
                status: row.get(6)?,
                total_amount: row.get(7)?,
                patient_count: row.get(8)?,
                updated_at: row.get(9)?,
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?.try_into()?);
        }
        Ok(summaries)
    }

    /// Delete an invoice.
    pub fn delete_invoice(&self, invoice_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM invoices WHERE invoice_id = ?", [invoice_id])?;
        Ok(rows_affected > 0)
    }
}

/// One row of the invoice list view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceSummary {
    pub invoice_id: String,
    pub invoice_number: String,
    pub facility_id: String,
    pub facility_name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: InvoiceStatus,
    pub total_amount: f64,
    /// Number of patient lines on the invoice
    pub patient_count: u32,
    pub updated_at: String,
}

/// Intermediate row struct for database mapping.
struct InvoiceRow {
    invoice_id: String,
    invoice_number: String,
    facility_id: String,
    facility_name: String,
    staff_id: String,
    staff_name: String,
    period_start: String,
    period_end: String,
    status: String,
    total_amount: f64,
    patients: String,
    audit_log: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            invoice_id: row.invoice_id,
            invoice_number: row.invoice_number,
            facility_id: row.facility_id,
            facility_name: row.facility_name,
            staff_id: row.staff_id,
            staff_name: row.staff_name,
            period_start: parse_date(&row.period_start)?,
            period_end: parse_date(&row.period_end)?,
            status: string_to_status(&row.status)?,
            total_amount: row.total_amount,
            patients: serde_json::from_str(&row.patients)?,
            audit_log: serde_json::from_str(&row.audit_log)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct InvoiceSummaryRow {
    invoice_id: String,
    invoice_number: String,
    facility_id: String,
    facility_name: String,
    period_start: String,
    period_end: String,
    status: String,
    total_amount: f64,
    patient_count: u32,
    updated_at: String,
}

impl TryFrom<InvoiceSummaryRow> for InvoiceSummary {
    type Error = DbError;

    fn try_from(row: InvoiceSummaryRow) -> Result<Self, Self::Error> {
        Ok(InvoiceSummary {
            invoice_id: row.invoice_id,
            invoice_number: row.invoice_number,
            facility_id: row.facility_id,
            facility_name: row.facility_name,
            period_start: parse_date(&row.period_start)?,
            period_end: parse_date(&row.period_end)?,
            status: string_to_status(&row.status)?,
            total_amount: row.total_amount,
            patient_count: row.patient_count,
            updated_at: row.updated_at,
        })
    }
}

fn status_to_string(status: &InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Draft => "draft",
        InvoiceStatus::Submitted => "submitted",
        InvoiceStatus::Paid => "paid",
        InvoiceStatus::Void => "void",
    }
}

fn string_to_status(s: &str) -> Result<InvoiceStatus, DbError> {
    match s {
        "draft" => Ok(InvoiceStatus::Draft),
        "submitted" => Ok(InvoiceStatus::Submitted),
        "paid" => Ok(InvoiceStatus::Paid),
        "void" => Ok(InvoiceStatus::Void),
        _ => Err(DbError::Constraint(format!(
            "Unknown invoice status: {}",
            s
        ))),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DbError::Constraint(format!("Invalid date {}: {}", s, e)))
}

impl AggregateStore<Invoice> for Database {
    fn load(&self, id: &str) -> StoreResult<Option<Invoice>> {
        Ok(self.get_invoice(id)?)
    }

    fn insert(&self, aggregate: &Invoice) -> StoreResult<()> {
        Ok(self.insert_invoice(aggregate)?)
    }

    fn save(&self, aggregate: &Invoice) -> StoreResult<()> {
        if !self.update_invoice(aggregate)? {
            return Err(StoreError::Backend(format!(
                "invoice {} vanished during save",
                aggregate.invoice_id
            )));
        }
        Ok(())
    }

    fn save_with_token(&self, aggregate: &Invoice, token: &str) -> StoreResult<()> {
        if !self.update_invoice_with_token(aggregate, token)? {
            return Err(StoreError::Backend(format!(
                "invoice {} vanished during save",
                aggregate.invoice_id
            )));
        }
        Ok(())
    }

    fn token_seen(&self, token: &str) -> StoreResult<bool> {
        Ok(self.token_applied(token)?)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.delete_invoice(id)?)
    }
}
