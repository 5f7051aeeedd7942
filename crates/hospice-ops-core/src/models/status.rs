//! Status vocabularies for visits, invoices, and chart-audit documents.
//!
//! All sets are closed. Transitions are unconstrained; the mutation engine
//! records every transition, including reopening a previously final status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a visit note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    /// Visit is on the schedule, note not started
    Plotted,
    /// Note written by the clinician
    Completed,
    /// Note approved by the reviewer
    Approved,
    /// Note returned for correction
    NeedsCorrection,
}

/// Billing status of an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Being assembled
    Draft,
    /// Sent to the payer
    Submitted,
    /// Payment received
    Paid,
    /// Cancelled, kept for the record
    Void,
}

/// Review status of a chart-audit document slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DocStatus {
    /// Nothing on file yet
    Empty,
    /// Paperwork started but not finished
    InProgress,
    /// Requirement satisfied
    Completed,
    /// On file but missing pieces
    Incomplete,
    /// Flagged for clinical concern
    Concern,
    /// Flagged for a skin integrity issue
    SkinIssue,
    /// Patient or family declined the service
    Declined,
}

/// Discipline that performs a visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum VisitType {
    Nursing,
    Aide,
    SocialWorker,
    Chaplain,
    Physician,
    Volunteer,
}

/// What actually happened at a scheduled visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ActionTaken {
    /// Visit performed as planned
    Completed,
    /// Patient unavailable, visit missed
    Missed,
    /// Patient or family refused the visit
    Refused,
    /// Moved to another date
    Rescheduled,
}

/// Classification of a free-text remark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RemarkCategory {
    Clinical,
    Scheduling,
    Billing,
    Other,
}
