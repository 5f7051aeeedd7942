//! QA chart-audit aggregate: assignment → patient review → requirement document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::audit::AuditLog;
use super::status::DocStatus;

/// One requirement document slot on a patient's chart audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaDocument {
    /// Requirement id this slot tracks (catalog key)
    pub requirement_id: String,
    /// Display label captured when the slot was created
    pub label: String,
    /// Review status
    pub status: DocStatus,
    /// Reviewer comment on the current status
    pub comment: Option<String>,
    /// Audit trail for this slot
    pub audit_log: AuditLog,
}

impl QaDocument {
    /// Create an empty slot for a requirement.
    pub fn new(requirement_id: String, label: String) -> Self {
        Self {
            requirement_id,
            label,
            status: DocStatus::Empty,
            comment: None,
            audit_log: AuditLog::new(),
        }
    }
}

/// Chart audit for one patient within an assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaPatientReview {
    /// Patient id from the census system
    pub patient_id: String,
    /// Patient display name
    pub patient_name: String,
    /// Medical record number
    pub medical_record_number: String,
    /// Reviewer remarks covering the whole chart
    pub remarks: Option<String>,
    /// Requirement documents keyed by requirement id
    pub documents: BTreeMap<String, QaDocument>,
    /// Audit trail for this review
    pub audit_log: AuditLog,
}

impl QaPatientReview {
    /// Create a review with no document slots.
    pub fn new(patient_id: String, patient_name: String, medical_record_number: String) -> Self {
        Self {
            patient_id,
            patient_name,
            medical_record_number,
            remarks: None,
            documents: BTreeMap::new(),
            audit_log: AuditLog::new(),
        }
    }
}

/// A monthly QA chart-audit cycle for one facility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QaAssignment {
    /// Unique assignment id
    pub assignment_id: String,
    /// Facility under review
    pub facility_id: String,
    /// Facility display name
    pub facility_name: String,
    /// Cycle month (1-12)
    pub month: u8,
    /// Cycle year
    pub year: u16,
    /// Roles assigned to perform the audit
    pub assigned_roles: Vec<String>,
    /// Per-patient chart reviews
    pub reviews: Vec<QaPatientReview>,
    /// Root audit trail; receives a copy of every nested change
    pub audit_log: AuditLog,
    /// Stored roll-up: patients still on service
    pub active_count: u32,
    /// Stored roll-up: patients discharged this cycle
    pub discharged_count: u32,
    /// Visits performed in the cycle, maintained by the caller
    pub visit_volume: u32,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl QaAssignment {
    /// Create an assignment with no reviews.
    pub fn new(facility_id: String, facility_name: String, month: u8, year: u16) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            assignment_id: uuid::Uuid::new_v4().to_string(),
            facility_id,
            facility_name,
            month,
            year,
            assigned_roles: Vec::new(),
            reviews: Vec::new(),
            audit_log: AuditLog::new(),
            active_count: 0,
            discharged_count: 0,
            visit_volume: 0,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_new_defaults() {
        let assignment = QaAssignment::new("fac-2".into(), "Juniper House".into(), 8, 2026);

        assert_eq!(assignment.assignment_id.len(), 36);
        assert_eq!(assignment.month, 8);
        assert_eq!(assignment.year, 2026);
        assert_eq!(assignment.active_count, 0);
        assert!(assignment.reviews.is_empty());
        assert!(assignment.audit_log.is_empty());
    }

    #[test]
    fn test_document_slot_starts_empty() {
        let doc = QaDocument::new("cti".into(), "Certification of Terminal Illness".into());
        assert!(matches!(doc.status, DocStatus::Empty));
        assert!(doc.comment.is_none());
        assert!(doc.audit_log.is_empty());
    }

    #[test]
    fn test_documents_keyed_by_requirement_id() {
        let mut review = QaPatientReview::new("p-4".into(), "L. Chen".into(), "MRN-204".into());
        review.documents.insert(
            "consent".into(),
            QaDocument::new("consent".into(), "Consent Forms".into()),
        );

        let json = serde_json::to_string(&review).unwrap();
        let back: QaPatientReview = serde_json::from_str(&json).unwrap();
        assert!(back.documents.contains_key("consent"));
        assert_eq!(back.documents["consent"].requirement_id, "consent");
    }
}
