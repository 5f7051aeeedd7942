//! Invoice aggregate: invoice → patient → visit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::audit::AuditLog;
use super::status::{ActionTaken, InvoiceStatus, NoteStatus, RemarkCategory, VisitType};

/// A single patient visit on an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    /// Unique visit id
    pub visit_id: String,
    /// Date the service was performed
    pub service_date: NaiveDate,
    /// Discipline that performed the visit
    pub visit_type: VisitType,
    /// What happened at the visit
    pub action_taken: ActionTaken,
    /// Remark classification
    pub remark_category: RemarkCategory,
    /// Free-text remark
    pub remark: Option<String>,
    /// Staff member who plotted the visit on the schedule
    pub plotted_by: String,
    /// Staff member who completed the visit
    pub completed_by: Option<String>,
    /// Clock-in time (HH:MM)
    pub time_in: Option<String>,
    /// Clock-out time (HH:MM)
    pub time_out: Option<String>,
    /// Note lifecycle status
    pub note_status: NoteStatus,
    /// Billable rate for this visit
    pub rate: f64,
    /// Audit trail for this visit
    pub audit_log: AuditLog,
}

impl Visit {
    /// Create a visit with a fresh id and an unstarted note.
    pub fn new(
        service_date: NaiveDate,
        visit_type: VisitType,
        action_taken: ActionTaken,
        plotted_by: String,
        rate: f64,
    ) -> Self {
        Self {
            visit_id: uuid::Uuid::new_v4().to_string(),
            service_date,
            visit_type,
            action_taken,
            remark_category: RemarkCategory::Other,
            remark: None,
            plotted_by,
            completed_by: None,
            time_in: None,
            time_out: None,
            note_status: NoteStatus::Plotted,
            rate,
            audit_log: AuditLog::new(),
        }
    }
}

/// A patient line on an invoice.
///
/// Carries identity seeded from the census at creation; the patient line
/// itself has no editable fields and no audit log of its own. Its visits do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoicePatient {
    /// Patient id from the census system
    pub patient_id: String,
    /// Patient display name
    pub patient_name: String,
    /// Medical record number
    pub medical_record_number: String,
    /// Whether the patient was discharged during the billing period
    pub discharged: bool,
    /// Visits billed for this patient
    pub visits: Vec<Visit>,
}

impl InvoicePatient {
    /// Create a patient line with no visits.
    pub fn new(patient_id: String, patient_name: String, medical_record_number: String) -> Self {
        Self {
            patient_id,
            patient_name,
            medical_record_number,
            discharged: false,
            visits: Vec::new(),
        }
    }
}

/// A facility billing invoice for one period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    /// Unique invoice id
    pub invoice_id: String,
    /// Human-facing invoice number
    pub invoice_number: String,
    /// Facility being billed
    pub facility_id: String,
    /// Facility display name
    pub facility_name: String,
    /// Staff member responsible for the invoice
    pub staff_id: String,
    /// Staff display name
    pub staff_name: String,
    /// First day of the billing period
    pub period_start: NaiveDate,
    /// Last day of the billing period
    pub period_end: NaiveDate,
    /// Billing status
    pub status: InvoiceStatus,
    /// Stored roll-up: sum of visit rates across all patients
    pub total_amount: f64,
    /// Patient lines
    pub patients: Vec<InvoicePatient>,
    /// Root audit trail; receives a copy of every nested change
    pub audit_log: AuditLog,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Invoice {
    /// Create an empty draft invoice.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoice_number: String,
        facility_id: String,
        facility_name: String,
        staff_id: String,
        staff_name: String,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            invoice_id: uuid::Uuid::new_v4().to_string(),
            invoice_number,
            facility_id,
            facility_name,
            staff_id,
            staff_name,
            period_start,
            period_end,
            status: InvoiceStatus::Draft,
            total_amount: 0.0,
            patients: Vec::new(),
            audit_log: AuditLog::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
