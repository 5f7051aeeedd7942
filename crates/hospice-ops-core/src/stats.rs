//! Derived statistics over loaded aggregates.
//!
//! Pure folds, recomputed from the nested records on every call. The mutation
//! engine refreshes the stored roll-up columns from these functions inside
//! every write, so summary listings can trust the stored values.

use crate::config::{EnabledColumns, DISCHARGE_REQUIREMENT};
use crate::models::{DocStatus, Invoice, NoteStatus, QaAssignment};

/// Sum of visit rates across every patient on the invoice.
pub fn invoice_total(invoice: &Invoice) -> f64 {
    invoice
        .patients
        .iter()
        .flat_map(|patient| patient.visits.iter())
        .map(|visit| visit.rate)
        .sum()
}

/// Active/discharged split of an assignment's patients.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryCounts {
    /// Patients still on service
    pub active: u32,
    /// Patients discharged this cycle
    pub discharged: u32,
}

/// Count active and discharged patients on an assignment.
///
/// A patient counts as discharged once their discharge document slot has
/// moved off `Empty`. A review with no discharge slot counts as active.
pub fn registry_counts(assignment: &QaAssignment) -> RegistryCounts {
    let mut counts = RegistryCounts {
        active: 0,
        discharged: 0,
    };
    for review in &assignment.reviews {
        let discharged = review
            .documents
            .get(DISCHARGE_REQUIREMENT)
            .map(|doc| doc.status != DocStatus::Empty)
            .unwrap_or(false);
        if discharged {
            counts.discharged += 1;
        } else {
            counts.active += 1;
        }
    }
    counts
}

/// Share of enabled document slots marked `Completed`, as a whole percentage
/// rounded to nearest.
///
/// The denominator is patients × enabled columns. Returns 0 when that
/// denominator is 0 (no patients, or no columns enabled). Slots for disabled
/// columns are excluded from the numerator even when completed.
pub fn completion_rate(assignment: &QaAssignment, enabled: &EnabledColumns) -> u8 {
    let denominator = assignment.reviews.len() * enabled.len();
    if denominator == 0 {
        return 0;
    }

    let completed = assignment
        .reviews
        .iter()
        .flat_map(|review| review.documents.iter())
        .filter(|(id, doc)| enabled.contains(id) && doc.status == DocStatus::Completed)
        .count();

    ((completed as f64 / denominator as f64) * 100.0).round() as u8
}

/// Note status counters across every visit on an invoice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteStatusCounts {
    pub plotted: u32,
    pub completed: u32,
    pub approved: u32,
    pub needs_correction: u32,
}

/// Count visit notes by status.
pub fn note_status_counts(invoice: &Invoice) -> NoteStatusCounts {
    let mut counts = NoteStatusCounts::default();
    for visit in invoice.patients.iter().flat_map(|p| p.visits.iter()) {
        match visit.note_status {
            NoteStatus::Plotted => counts.plotted += 1,
            NoteStatus::Completed => counts.completed += 1,
            NoteStatus::Approved => counts.approved += 1,
            NoteStatus::NeedsCorrection => counts.needs_correction += 1,
        }
    }
    counts
}

/// Document status counters across every review on an assignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocStatusCounts {
    pub empty: u32,
    pub in_progress: u32,
    pub completed: u32,
    pub incomplete: u32,
    pub concern: u32,
    pub skin_issue: u32,
    pub declined: u32,
}

/// Count document slots by status.
pub fn document_status_counts(assignment: &QaAssignment) -> DocStatusCounts {
    let mut counts = DocStatusCounts::default();
    for doc in assignment
        .reviews
        .iter()
        .flat_map(|review| review.documents.values())
    {
        match doc.status {
            DocStatus::Empty => counts.empty += 1,
            DocStatus::InProgress => counts.in_progress += 1,
            DocStatus::Completed => counts.completed += 1,
            DocStatus::Incomplete => counts.incomplete += 1,
            DocStatus::Concern => counts.concern += 1,
            DocStatus::SkinIssue => counts.skin_issue += 1,
            DocStatus::Declined => counts.declined += 1,
        }
    }
    counts
}
