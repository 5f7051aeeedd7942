//! Id-based resolution of nested records inside a loaded aggregate.
//!
//! Collections are matched by record id, never by position. Callers reorder
//! the in-memory collections freely for display; a stale index can therefore
//! never reach the wrong record.

use thiserror::Error;

use crate::models::{Invoice, InvoicePatient, QaAssignment, QaDocument, QaPatientReview, Visit};

/// A nested id failed to resolve, naming the level that missed.
#[derive(Error, Debug, PartialEq)]
pub enum LocateError {
    #[error("patient {0} not on invoice")]
    PatientNotFound(String),

    #[error("visit {0} not found for patient {1}")]
    VisitNotFound(String, String),

    #[error("patient review {0} not in assignment")]
    ReviewNotFound(String),

    #[error("document {0} not found for patient {1}")]
    DocumentNotFound(String, String),
}

/// Find a patient line on an invoice.
pub fn patient<'a>(invoice: &'a Invoice, patient_id: &str) -> Result<&'a InvoicePatient, LocateError> {
    invoice
        .patients
        .iter()
        .find(|p| p.patient_id == patient_id)
        .ok_or_else(|| LocateError::PatientNotFound(patient_id.to_string()))
}

/// Find a patient line on an invoice, mutably.
pub fn patient_mut<'a>(
    invoice: &'a mut Invoice,
    patient_id: &str,
) -> Result<&'a mut InvoicePatient, LocateError> {
    invoice
        .patients
        .iter_mut()
        .find(|p| p.patient_id == patient_id)
        .ok_or_else(|| LocateError::PatientNotFound(patient_id.to_string()))
}

/// Find a visit under a patient line.
pub fn visit<'a>(
    invoice: &'a Invoice,
    patient_id: &str,
    visit_id: &str,
) -> Result<&'a Visit, LocateError> {
    patient(invoice, patient_id)?
        .visits
        .iter()
        .find(|v| v.visit_id == visit_id)
        .ok_or_else(|| LocateError::VisitNotFound(visit_id.to_string(), patient_id.to_string()))
}

/// Find a visit under a patient line, mutably.
pub fn visit_mut<'a>(
    invoice: &'a mut Invoice,
    patient_id: &str,
    visit_id: &str,
) -> Result<&'a mut Visit, LocateError> {
    patient_mut(invoice, patient_id)?
        .visits
        .iter_mut()
        .find(|v| v.visit_id == visit_id)
        .ok_or_else(|| LocateError::VisitNotFound(visit_id.to_string(), patient_id.to_string()))
}

/// Find a patient review on an assignment.
pub fn review<'a>(
    assignment: &'a QaAssignment,
    patient_id: &str,
) -> Result<&'a QaPatientReview, LocateError> {
    assignment
        .reviews
        .iter()
        .find(|r| r.patient_id == patient_id)
        .ok_or_else(|| LocateError::ReviewNotFound(patient_id.to_string()))
}

/// Find a patient review on an assignment, mutably.
pub fn review_mut<'a>(
    assignment: &'a mut QaAssignment,
    patient_id: &str,
) -> Result<&'a mut QaPatientReview, LocateError> {
    assignment
        .reviews
        .iter_mut()
        .find(|r| r.patient_id == patient_id)
        .ok_or_else(|| LocateError::ReviewNotFound(patient_id.to_string()))
}

/// Find a requirement document slot under a review.
pub fn document<'a>(
    assignment: &'a QaAssignment,
    patient_id: &str,
    requirement_id: &str,
) -> Result<&'a QaDocument, LocateError> {
    review(assignment, patient_id)?
        .documents
        .get(requirement_id)
        .ok_or_else(|| {
            LocateError::DocumentNotFound(requirement_id.to_string(), patient_id.to_string())
        })
}

/// Find a requirement document slot under a review, mutably.
pub fn document_mut<'a>(
    assignment: &'a mut QaAssignment,
    patient_id: &str,
    requirement_id: &str,
) -> Result<&'a mut QaDocument, LocateError> {
    review_mut(assignment, patient_id)?
        .documents
        .get_mut(requirement_id)
        .ok_or_else(|| {
            LocateError::DocumentNotFound(requirement_id.to_string(), patient_id.to_string())
        })
}
