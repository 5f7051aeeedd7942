//! Field-level diffing for editable records.
//!
//! Each record type declares its updatable fields as a closed enum, so an
//! update can only name fields that exist. Diffing compares an update list
//! against the current record and emits a [`FieldChange`] only where the
//! value actually differs; applying writes the new values. Callers holding a
//! fully edited copy instead of a change list use the `*_replace` helpers to
//! expand it, then diff keeps the changed subset.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::models::{
    ActionTaken, DocStatus, FieldChange, Invoice, InvoiceStatus, NoteStatus, QaAssignment,
    QaDocument, QaPatientReview, RemarkCategory, Visit, VisitType,
};

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// An update to a single visit field.
#[derive(Debug, Clone, PartialEq)]
pub enum VisitUpdate {
    ServiceDate(NaiveDate),
    VisitType(VisitType),
    ActionTaken(ActionTaken),
    RemarkCategory(RemarkCategory),
    Remark(Option<String>),
    PlottedBy(String),
    CompletedBy(Option<String>),
    TimeIn(Option<String>),
    TimeOut(Option<String>),
    NoteStatus(NoteStatus),
    Rate(f64),
}

/// Changes the given updates would make to a visit, old values captured
/// from the current record.
pub fn diff_visit(visit: &Visit, updates: &[VisitUpdate]) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for update in updates {
        match update {
            VisitUpdate::ServiceDate(value) => {
                if visit.service_date != *value {
                    changes.push(FieldChange::new(
                        "service_date",
                        to_json(&visit.service_date),
                        to_json(value),
                    ));
                }
            }
            VisitUpdate::VisitType(value) => {
                if visit.visit_type != *value {
                    changes.push(FieldChange::new(
                        "visit_type",
                        to_json(&visit.visit_type),
                        to_json(value),
                    ));
                }
            }
            VisitUpdate::ActionTaken(value) => {
                if visit.action_taken != *value {
                    changes.push(FieldChange::new(
                        "action_taken",
                        to_json(&visit.action_taken),
                        to_json(value),
                    ));
                }
            }
            VisitUpdate::RemarkCategory(value) => {
                if visit.remark_category != *value {
                    changes.push(FieldChange::new(
                        "remark_category",
                        to_json(&visit.remark_category),
                        to_json(value),
                    ));
                }
            }
            VisitUpdate::Remark(value) => {
                if visit.remark != *value {
                    changes.push(FieldChange::new(
                        "remark",
                        to_json(&visit.remark),
                        to_json(value),
                    ));
                }
            }
            VisitUpdate::PlottedBy(value) => {
                if visit.plotted_by != *value {
                    changes.push(FieldChange::new(
                        "plotted_by",
                        to_json(&visit.plotted_by),
                        to_json(value),
                    ));
                }
            }
            VisitUpdate::CompletedBy(value) => {
                if visit.completed_by != *value {
                    changes.push(FieldChange::new(
                        "completed_by",
                        to_json(&visit.completed_by),
                        to_json(value),
                    ));
                }
            }
            VisitUpdate::TimeIn(value) => {
                if visit.time_in != *value {
                    changes.push(FieldChange::new(
                        "time_in",
                        to_json(&visit.time_in),
                        to_json(value),
                    ));
                }
            }
            VisitUpdate::TimeOut(value) => {
                if visit.time_out != *value {
                    changes.push(FieldChange::new(
                        "time_out",
                        to_json(&visit.time_out),
                        to_json(value),
                    ));
                }
            }
            VisitUpdate::NoteStatus(value) => {
                if visit.note_status != *value {
                    changes.push(FieldChange::new(
                        "note_status",
                        to_json(&visit.note_status),
                        to_json(value),
                    ));
                }
            }
            VisitUpdate::Rate(value) => {
                if visit.rate != *value {
                    changes.push(FieldChange::new("rate", to_json(&visit.rate), to_json(value)));
                }
            }
        }
    }
    changes
}

/// Write the updated values into the visit.
pub fn apply_visit(visit: &mut Visit, updates: &[VisitUpdate]) {
    for update in updates {
        match update {
            VisitUpdate::ServiceDate(value) => visit.service_date = *value,
            VisitUpdate::VisitType(value) => visit.visit_type = value.clone(),
            VisitUpdate::ActionTaken(value) => visit.action_taken = value.clone(),
            VisitUpdate::RemarkCategory(value) => visit.remark_category = value.clone(),
            VisitUpdate::Remark(value) => visit.remark = value.clone(),
            VisitUpdate::PlottedBy(value) => visit.plotted_by = value.clone(),
            VisitUpdate::CompletedBy(value) => visit.completed_by = value.clone(),
            VisitUpdate::TimeIn(value) => visit.time_in = value.clone(),
            VisitUpdate::TimeOut(value) => visit.time_out = value.clone(),
            VisitUpdate::NoteStatus(value) => visit.note_status = value.clone(),
            VisitUpdate::Rate(value) => visit.rate = *value,
        }
    }
}

/// Expand an edited visit into updates for every editable field.
pub fn visit_replace(edited: &Visit) -> Vec<VisitUpdate> {
    vec![
        VisitUpdate::ServiceDate(edited.service_date),
        VisitUpdate::VisitType(edited.visit_type.clone()),
        VisitUpdate::ActionTaken(edited.action_taken.clone()),
        VisitUpdate::RemarkCategory(edited.remark_category.clone()),
        VisitUpdate::Remark(edited.remark.clone()),
        VisitUpdate::PlottedBy(edited.plotted_by.clone()),
        VisitUpdate::CompletedBy(edited.completed_by.clone()),
        VisitUpdate::TimeIn(edited.time_in.clone()),
        VisitUpdate::TimeOut(edited.time_out.clone()),
        VisitUpdate::NoteStatus(edited.note_status.clone()),
        VisitUpdate::Rate(edited.rate),
    ]
}

/// An update to a requirement document slot.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentUpdate {
    /// Set the review status. A comment passed here rides on the status
    /// change in the audit trail and replaces the stored comment; `None`
    /// leaves the stored comment alone.
    Status {
        status: DocStatus,
        comment: Option<String>,
    },
    /// Set the stored comment directly. `None` clears it.
    Comment(Option<String>),
}

/// Changes the given updates would make to a document slot.
pub fn diff_document(doc: &QaDocument, updates: &[DocumentUpdate]) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for update in updates {
        match update {
            DocumentUpdate::Status { status, comment } => {
                if doc.status != *status {
                    let mut change =
                        FieldChange::new("status", to_json(&doc.status), to_json(status));
                    change.comment = comment.clone();
                    changes.push(change);
                } else if comment.is_some() && doc.comment != *comment {
                    changes.push(FieldChange::new(
                        "comment",
                        to_json(&doc.comment),
                        to_json(comment),
                    ));
                }
            }
            DocumentUpdate::Comment(value) => {
                if doc.comment != *value {
                    changes.push(FieldChange::new(
                        "comment",
                        to_json(&doc.comment),
                        to_json(value),
                    ));
                }
            }
        }
    }
    changes
}

/// Write the updated values into the document slot.
pub fn apply_document(doc: &mut QaDocument, updates: &[DocumentUpdate]) {
    for update in updates {
        match update {
            DocumentUpdate::Status { status, comment } => {
                doc.status = status.clone();
                if comment.is_some() {
                    doc.comment = comment.clone();
                }
            }
            DocumentUpdate::Comment(value) => doc.comment = value.clone(),
        }
    }
}

/// Expand an edited document slot into updates for every editable field.
pub fn document_replace(edited: &QaDocument) -> Vec<DocumentUpdate> {
    vec![
        DocumentUpdate::Status {
            status: edited.status.clone(),
            comment: None,
        },
        DocumentUpdate::Comment(edited.comment.clone()),
    ]
}

/// An update to a patient review.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewUpdate {
    /// Set the chart-level remarks. `None` clears them.
    Remarks(Option<String>),
}

/// Changes the given updates would make to a review.
pub fn diff_review(review: &QaPatientReview, updates: &[ReviewUpdate]) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for update in updates {
        match update {
            ReviewUpdate::Remarks(value) => {
                if review.remarks != *value {
                    changes.push(FieldChange::new(
                        "remarks",
                        to_json(&review.remarks),
                        to_json(value),
                    ));
                }
            }
        }
    }
    changes
}

/// Write the updated values into the review.
pub fn apply_review(review: &mut QaPatientReview, updates: &[ReviewUpdate]) {
    for update in updates {
        match update {
            ReviewUpdate::Remarks(value) => review.remarks = value.clone(),
        }
    }
}

/// Expand an edited review into updates for every editable field.
pub fn review_replace(edited: &QaPatientReview) -> Vec<ReviewUpdate> {
    vec![ReviewUpdate::Remarks(edited.remarks.clone())]
}

/// An update to invoice root fields.
#[derive(Debug, Clone, PartialEq)]
pub enum InvoiceUpdate {
    Status(InvoiceStatus),
}

/// Changes the given updates would make to the invoice root.
pub fn diff_invoice(invoice: &Invoice, updates: &[InvoiceUpdate]) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for update in updates {
        match update {
            InvoiceUpdate::Status(value) => {
                if invoice.status != *value {
                    changes.push(FieldChange::new(
                        "status",
                        to_json(&invoice.status),
                        to_json(value),
                    ));
                }
            }
        }
    }
    changes
}

/// Write the updated values into the invoice root.
pub fn apply_invoice(invoice: &mut Invoice, updates: &[InvoiceUpdate]) {
    for update in updates {
        match update {
            InvoiceUpdate::Status(value) => invoice.status = value.clone(),
        }
    }
}

/// Expand an edited invoice root into updates for every editable field.
pub fn invoice_replace(edited: &Invoice) -> Vec<InvoiceUpdate> {
    vec![InvoiceUpdate::Status(edited.status.clone())]
}

/// An update to assignment root fields.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentUpdate {
    VisitVolume(u32),
    AssignedRoles(Vec<String>),
}

/// Changes the given updates would make to the assignment root.
pub fn diff_assignment(assignment: &QaAssignment, updates: &[AssignmentUpdate]) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for update in updates {
        match update {
            AssignmentUpdate::VisitVolume(value) => {
                if assignment.visit_volume != *value {
                    changes.push(FieldChange::new(
                        "visit_volume",
                        to_json(&assignment.visit_volume),
                        to_json(value),
                    ));
                }
            }
            AssignmentUpdate::AssignedRoles(value) => {
                if assignment.assigned_roles != *value {
                    changes.push(FieldChange::new(
                        "assigned_roles",
                        to_json(&assignment.assigned_roles),
                        to_json(value),
                    ));
                }
            }
        }
    }
    changes
}

/// Write the updated values into the assignment root.
pub fn apply_assignment(assignment: &mut QaAssignment, updates: &[AssignmentUpdate]) {
    for update in updates {
        match update {
            AssignmentUpdate::VisitVolume(value) => assignment.visit_volume = *value,
            AssignmentUpdate::AssignedRoles(value) => assignment.assigned_roles = value.clone(),
        }
    }
}

/// Expand an edited assignment root into updates for every editable field.
pub fn assignment_replace(edited: &QaAssignment) -> Vec<AssignmentUpdate> {
    vec![
        AssignmentUpdate::VisitVolume(edited.visit_volume),
        AssignmentUpdate::AssignedRoles(edited.assigned_roles.clone()),
    ]
}
