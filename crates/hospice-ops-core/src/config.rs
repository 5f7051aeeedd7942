//! Requirement catalog and per-facility column configuration.
//!
//! The column filter is consulted by read-side statistics and views only.
//! Mutations ignore it, so a column disabled for a facility keeps its data
//! and audit history and reappears intact when re-enabled.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Requirement id of the discharge paperwork column.
///
/// Registry counts treat a patient as discharged once this slot moves off
/// [`DocStatus::Empty`](crate::models::DocStatus::Empty).
pub const DISCHARGE_REQUIREMENT: &str = "discharge";

/// A chart-audit requirement column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    /// Stable id, used as the document slot key
    pub id: String,
    /// Display label
    pub label: String,
}

/// The known chart-audit requirements, in display order.
pub fn requirement_catalog() -> Vec<Requirement> {
    [
        ("admission", "Admission Packet"),
        ("consent", "Consent Forms"),
        ("election", "Election of Benefits"),
        ("cti", "Certification of Terminal Illness"),
        ("f2f", "Face-to-Face Encounter"),
        ("poc", "Plan of Care"),
        ("idg", "IDG Meeting Notes"),
        ("medication", "Medication Profile"),
        ("hope", "HOPE Assessment"),
        ("visit_notes", "Visit Notes"),
        ("supervisory", "Aide Supervisory Visits"),
        ("labs", "Lab Results"),
        ("dme", "DME Orders"),
        ("bereavement", "Bereavement Plan"),
        ("volunteer", "Volunteer Coordination"),
        ("chaplain", "Chaplain Notes"),
        ("msw", "MSW Assessments"),
        ("lcd", "LCD Worksheet"),
        ("discharge", "Discharge Paperwork"),
    ]
    .into_iter()
    .map(|(id, label)| Requirement {
        id: id.to_string(),
        label: label.to_string(),
    })
    .collect()
}

/// Per-facility allow-list of requirement columns.
#[derive(Debug, Clone, PartialEq)]
pub struct EnabledColumns {
    ids: BTreeSet<String>,
}

impl EnabledColumns {
    /// Every known requirement enabled. The default when a facility has no
    /// stored override.
    pub fn all() -> Self {
        Self {
            ids: requirement_catalog().into_iter().map(|r| r.id).collect(),
        }
    }

    /// Restrict to the given requirement ids. Ids outside the catalog are
    /// dropped.
    pub fn subset<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let known: BTreeSet<String> = requirement_catalog().into_iter().map(|r| r.id).collect();
        Self {
            ids: ids.into_iter().filter(|id| known.contains(id)).collect(),
        }
    }

    /// Whether a requirement column is enabled.
    pub fn contains(&self, requirement_id: &str) -> bool {
        self.ids.contains(requirement_id)
    }

    /// Number of enabled columns.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no columns are enabled.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Enabled ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(|s| s.as_str())
    }

    /// Catalog entries that are enabled, in display order.
    pub fn requirements(&self) -> Vec<Requirement> {
        requirement_catalog()
            .into_iter()
            .filter(|r| self.ids.contains(&r.id))
            .collect()
    }
}
