//! Audit-trailed mutation engine for invoices and QA assignments.
//!
//! Every operation follows the same unit of work: load the aggregate fresh,
//! resolve the target record by id, diff the requested updates, apply them,
//! record one audit entry at every applicable scope, refresh stored roll-ups,
//! and persist the whole aggregate. A failure anywhere abandons the loaded
//! copy, so no partial state can ever be stored.

pub mod diff;
pub mod locate;
pub mod store;

pub use diff::{AssignmentUpdate, DocumentUpdate, InvoiceUpdate, ReviewUpdate, VisitUpdate};
pub use locate::LocateError;
pub use store::{AggregateStore, StoreError, StoreResult};

use chrono::NaiveDate;
use log::{debug, info};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config;
use crate::models::{
    Actor, AuditAction, AuditEntry, FieldChange, Invoice, InvoicePatient, QaAssignment,
    QaDocument, QaPatientReview, Visit,
};
use crate::stats;

/// Mutation engine errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Aggregate not found: {0}")]
    AggregateNotFound(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Record already exists: {0}")]
    RecordExists(String),

    #[error("Actor id must not be empty")]
    MissingActor,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<LocateError> for EngineError {
    fn from(e: LocateError) -> Self {
        EngineError::RecordNotFound(e.to_string())
    }
}

/// Policy knobs for update handling.
#[derive(Debug, Clone)]
pub struct UpdatePolicy {
    /// When true, an update whose diff comes back empty writes nothing at
    /// all. When false, the empty entry is recorded and persisted anyway.
    pub skip_noop_updates: bool,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            skip_noop_updates: true,
        }
    }
}

/// Result of a mutating engine call.
#[derive(Debug, Clone)]
pub struct MutationOutcome<A> {
    /// Aggregate state after the operation
    pub aggregate: A,
    /// The audit entry recorded, when one was
    pub entry: Option<AuditEntry>,
}

/// Root-level behavior the engine needs from an aggregate.
pub trait Aggregate {
    /// Root record id.
    fn id(&self) -> &str;
    /// Recompute the stored roll-up fields from the nested records.
    fn refresh_rollups(&mut self);
    /// Stamp the updated_at timestamp.
    fn touch(&mut self);
}

impl Aggregate for Invoice {
    fn id(&self) -> &str {
        &self.invoice_id
    }

    fn refresh_rollups(&mut self) {
        self.total_amount = stats::invoice_total(self);
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

impl Aggregate for QaAssignment {
    fn id(&self) -> &str {
        &self.assignment_id
    }

    fn refresh_rollups(&mut self) {
        let counts = stats::registry_counts(self);
        self.active_count = counts.active;
        self.discharged_count = counts.discharged;
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Header and roster for a new invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_number: String,
    pub facility_id: String,
    pub facility_name: String,
    pub staff_id: String,
    pub staff_name: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Patient lines built by the caller from the census
    pub patients: Vec<InvoicePatient>,
}

/// Cycle settings and roster for a new assignment.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub facility_id: String,
    pub facility_name: String,
    /// Cycle month (1-12)
    pub month: u8,
    pub year: u16,
    pub assigned_roles: Vec<String>,
    pub visit_volume: u32,
    pub patients: Vec<RosterPatient>,
}

/// Census identity used to seed a patient review.
#[derive(Debug, Clone)]
pub struct RosterPatient {
    pub patient_id: String,
    pub patient_name: String,
    pub medical_record_number: String,
}

fn ensure_actor(actor: &Actor) -> EngineResult<()> {
    if actor.id.trim().is_empty() {
        return Err(EngineError::MissingActor);
    }
    Ok(())
}

/// Applies audited mutations to stored aggregates.
pub struct MutationEngine<'a, S> {
    store: &'a S,
    policy: UpdatePolicy,
}

impl<'a, S> MutationEngine<'a, S> {
    /// Create an engine with the default policy.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            policy: UpdatePolicy::default(),
        }
    }

    /// Create an engine with an explicit policy.
    pub fn with_policy(store: &'a S, policy: UpdatePolicy) -> Self {
        Self { store, policy }
    }

    fn load_required<A>(&self, id: &str) -> EngineResult<A>
    where
        S: AggregateStore<A>,
    {
        self.store
            .load(id)?
            .ok_or_else(|| EngineError::AggregateNotFound(id.to_string()))
    }

    /// When the caller's idempotency token was already applied, return the
    /// stored aggregate unchanged instead of mutating again.
    fn replay<A>(&self, id: &str, token: Option<&str>) -> EngineResult<Option<A>>
    where
        S: AggregateStore<A>,
    {
        if let Some(token) = token {
            if self.store.token_seen(token)? {
                debug!("token {} already applied, returning stored state", token);
                return Ok(Some(self.load_required(id)?));
            }
        }
        Ok(None)
    }

    fn persist<A>(&self, aggregate: &mut A, token: Option<&str>) -> EngineResult<()>
    where
        A: Aggregate,
        S: AggregateStore<A>,
    {
        aggregate.refresh_rollups();
        aggregate.touch();
        match token {
            Some(token) => self.store.save_with_token(aggregate, token)?,
            None => self.store.save(aggregate)?,
        }
        Ok(())
    }
}

impl<'a, S: AggregateStore<Invoice>> MutationEngine<'a, S> {
    /// Create an invoice from a header and census roster.
    ///
    /// Every visit arriving with the roster gets a creation entry in its own
    /// log; the invoice root gets one creation entry. Nothing cascades at
    /// creation time.
    pub fn create_invoice(
        &self,
        new_invoice: NewInvoice,
        actor: &Actor,
    ) -> EngineResult<MutationOutcome<Invoice>> {
        ensure_actor(actor)?;

        let mut invoice = Invoice::new(
            new_invoice.invoice_number,
            new_invoice.facility_id,
            new_invoice.facility_name,
            new_invoice.staff_id,
            new_invoice.staff_name,
            new_invoice.period_start,
            new_invoice.period_end,
        );
        invoice.patients = new_invoice.patients;

        for patient in &mut invoice.patients {
            for visit in &mut patient.visits {
                visit
                    .audit_log
                    .record(AuditEntry::new(actor, AuditAction::Create, vec![]));
            }
        }
        let entry = AuditEntry::new(actor, AuditAction::Create, vec![]);
        invoice.audit_log.record(entry.clone());

        invoice.refresh_rollups();
        self.store.insert(&invoice)?;
        info!(
            "created invoice {} with {} patient(s)",
            invoice.invoice_id,
            invoice.patients.len()
        );

        Ok(MutationOutcome {
            aggregate: invoice,
            entry: Some(entry),
        })
    }

    /// Load an invoice for a detail view.
    pub fn fetch_invoice(&self, invoice_id: &str) -> EngineResult<Invoice> {
        self.load_required(invoice_id)
    }

    /// Delete an invoice outright. There is no soft delete.
    pub fn delete_invoice(&self, invoice_id: &str) -> EngineResult<()> {
        if !self.store.delete(invoice_id)? {
            return Err(EngineError::AggregateNotFound(invoice_id.to_string()));
        }
        info!("deleted invoice {}", invoice_id);
        Ok(())
    }

    /// Update fields on a visit.
    ///
    /// The entry is recorded at the visit and at the invoice root. The
    /// patient line between them carries no log of its own.
    pub fn update_visit(
        &self,
        invoice_id: &str,
        patient_id: &str,
        visit_id: &str,
        updates: &[VisitUpdate],
        actor: &Actor,
        token: Option<&str>,
    ) -> EngineResult<MutationOutcome<Invoice>> {
        ensure_actor(actor)?;
        if let Some(aggregate) = self.replay(invoice_id, token)? {
            return Ok(MutationOutcome {
                aggregate,
                entry: None,
            });
        }
        let mut invoice: Invoice = self.load_required(invoice_id)?;

        let visit = locate::visit_mut(&mut invoice, patient_id, visit_id)?;
        let changes = diff::diff_visit(visit, updates);
        if changes.is_empty() && self.policy.skip_noop_updates {
            debug!("update_visit {}: no field changed, skipping", visit_id);
            return Ok(MutationOutcome {
                aggregate: invoice,
                entry: None,
            });
        }
        diff::apply_visit(visit, updates);

        let entry = AuditEntry::new(actor, AuditAction::Update, changes);
        visit.audit_log.record(entry.clone());
        invoice.audit_log.record(entry.clone());

        self.persist(&mut invoice, token)?;
        debug!(
            "update_visit {}: recorded {} field change(s)",
            visit_id,
            entry.changes.len()
        );
        Ok(MutationOutcome {
            aggregate: invoice,
            entry: Some(entry),
        })
    }

    /// Update invoice root fields. The entry lands at the root log only.
    pub fn update_invoice(
        &self,
        invoice_id: &str,
        updates: &[InvoiceUpdate],
        actor: &Actor,
        token: Option<&str>,
    ) -> EngineResult<MutationOutcome<Invoice>> {
        ensure_actor(actor)?;
        if let Some(aggregate) = self.replay(invoice_id, token)? {
            return Ok(MutationOutcome {
                aggregate,
                entry: None,
            });
        }
        let mut invoice: Invoice = self.load_required(invoice_id)?;

        let changes = diff::diff_invoice(&invoice, updates);
        if changes.is_empty() && self.policy.skip_noop_updates {
            debug!("update_invoice {}: no field changed, skipping", invoice_id);
            return Ok(MutationOutcome {
                aggregate: invoice,
                entry: None,
            });
        }
        diff::apply_invoice(&mut invoice, updates);

        let entry = AuditEntry::new(actor, AuditAction::Update, changes);
        invoice.audit_log.record(entry.clone());

        self.persist(&mut invoice, token)?;
        Ok(MutationOutcome {
            aggregate: invoice,
            entry: Some(entry),
        })
    }

    /// Add a visit to a patient line.
    ///
    /// The new visit gets a creation entry in its own log; the invoice root
    /// gets an entry describing the addition.
    pub fn add_visit(
        &self,
        invoice_id: &str,
        patient_id: &str,
        mut visit: Visit,
        actor: &Actor,
        token: Option<&str>,
    ) -> EngineResult<MutationOutcome<Invoice>> {
        ensure_actor(actor)?;
        if let Some(aggregate) = self.replay(invoice_id, token)? {
            return Ok(MutationOutcome {
                aggregate,
                entry: None,
            });
        }
        let mut invoice: Invoice = self.load_required(invoice_id)?;

        let patient = locate::patient_mut(&mut invoice, patient_id)?;
        if patient.visits.iter().any(|v| v.visit_id == visit.visit_id) {
            return Err(EngineError::RecordExists(format!(
                "visit {} already on patient {}",
                visit.visit_id, patient_id
            )));
        }

        visit
            .audit_log
            .record(AuditEntry::new(actor, AuditAction::Create, vec![]));
        let entry = AuditEntry::new(
            actor,
            AuditAction::Update,
            vec![FieldChange::new(
                "visits",
                Value::Null,
                json!({ "added": visit.visit_id.clone() }),
            )],
        );
        patient.visits.push(visit);
        invoice.audit_log.record(entry.clone());

        self.persist(&mut invoice, token)?;
        debug!("added visit to patient {} on invoice {}", patient_id, invoice_id);
        Ok(MutationOutcome {
            aggregate: invoice,
            entry: Some(entry),
        })
    }

    /// Remove a visit outright.
    ///
    /// The visit's own audit log is deleted with it; entries previously
    /// cascaded to the invoice log remain. No removal entry is recorded.
    pub fn remove_visit(
        &self,
        invoice_id: &str,
        patient_id: &str,
        visit_id: &str,
        actor: &Actor,
    ) -> EngineResult<MutationOutcome<Invoice>> {
        ensure_actor(actor)?;
        let mut invoice: Invoice = self.load_required(invoice_id)?;

        let patient = locate::patient_mut(&mut invoice, patient_id)?;
        let position = patient
            .visits
            .iter()
            .position(|v| v.visit_id == visit_id)
            .ok_or_else(|| {
                LocateError::VisitNotFound(visit_id.to_string(), patient_id.to_string())
            })?;
        patient.visits.remove(position);

        self.persist(&mut invoice, None)?;
        debug!("removed visit {} from invoice {}", visit_id, invoice_id);
        Ok(MutationOutcome {
            aggregate: invoice,
            entry: None,
        })
    }
}

impl<'a, S: AggregateStore<QaAssignment>> MutationEngine<'a, S> {
    /// Initialize a QA cycle from a facility roster.
    ///
    /// Every roster patient gets a review carrying a slot for each known
    /// requirement, all starting Empty. Each slot and each review gets a
    /// creation entry in its own log; the root gets one creation entry.
    pub fn init_assignment(
        &self,
        new_assignment: NewAssignment,
        actor: &Actor,
    ) -> EngineResult<MutationOutcome<QaAssignment>> {
        ensure_actor(actor)?;

        let mut assignment = QaAssignment::new(
            new_assignment.facility_id,
            new_assignment.facility_name,
            new_assignment.month,
            new_assignment.year,
        );
        assignment.assigned_roles = new_assignment.assigned_roles;
        assignment.visit_volume = new_assignment.visit_volume;

        let catalog = config::requirement_catalog();
        for roster in new_assignment.patients {
            let mut review = QaPatientReview::new(
                roster.patient_id,
                roster.patient_name,
                roster.medical_record_number,
            );
            for requirement in &catalog {
                let mut doc = QaDocument::new(requirement.id.clone(), requirement.label.clone());
                doc.audit_log
                    .record(AuditEntry::new(actor, AuditAction::Create, vec![]));
                review.documents.insert(requirement.id.clone(), doc);
            }
            review
                .audit_log
                .record(AuditEntry::new(actor, AuditAction::Create, vec![]));
            assignment.reviews.push(review);
        }
        let entry = AuditEntry::new(actor, AuditAction::Create, vec![]);
        assignment.audit_log.record(entry.clone());

        assignment.refresh_rollups();
        self.store.insert(&assignment)?;
        info!(
            "initialized assignment {} covering {} patient(s)",
            assignment.assignment_id,
            assignment.reviews.len()
        );

        Ok(MutationOutcome {
            aggregate: assignment,
            entry: Some(entry),
        })
    }

    /// Load an assignment for a detail view.
    pub fn fetch_assignment(&self, assignment_id: &str) -> EngineResult<QaAssignment> {
        self.load_required(assignment_id)
    }

    /// Delete an assignment outright. There is no soft delete.
    pub fn delete_assignment(&self, assignment_id: &str) -> EngineResult<()> {
        if !self.store.delete(assignment_id)? {
            return Err(EngineError::AggregateNotFound(assignment_id.to_string()));
        }
        info!("deleted assignment {}", assignment_id);
        Ok(())
    }

    /// Update fields on a requirement document slot.
    ///
    /// The entry is recorded at three scopes: the document, its patient
    /// review, and the assignment root.
    pub fn update_document(
        &self,
        assignment_id: &str,
        patient_id: &str,
        requirement_id: &str,
        updates: &[DocumentUpdate],
        actor: &Actor,
        token: Option<&str>,
    ) -> EngineResult<MutationOutcome<QaAssignment>> {
        ensure_actor(actor)?;
        if let Some(aggregate) = self.replay(assignment_id, token)? {
            return Ok(MutationOutcome {
                aggregate,
                entry: None,
            });
        }
        let mut assignment: QaAssignment = self.load_required(assignment_id)?;

        let doc = locate::document_mut(&mut assignment, patient_id, requirement_id)?;
        let changes = diff::diff_document(doc, updates);
        if changes.is_empty() && self.policy.skip_noop_updates {
            debug!(
                "update_document {}/{}: no field changed, skipping",
                patient_id, requirement_id
            );
            return Ok(MutationOutcome {
                aggregate: assignment,
                entry: None,
            });
        }
        diff::apply_document(doc, updates);

        let entry = AuditEntry::new(actor, AuditAction::Update, changes);
        doc.audit_log.record(entry.clone());

        let review = locate::review_mut(&mut assignment, patient_id)?;
        review.audit_log.record(entry.clone());
        assignment.audit_log.record(entry.clone());

        self.persist(&mut assignment, token)?;
        debug!(
            "update_document {}/{}: recorded {} field change(s)",
            patient_id,
            requirement_id,
            entry.changes.len()
        );
        Ok(MutationOutcome {
            aggregate: assignment,
            entry: Some(entry),
        })
    }

    /// Update fields on a patient review.
    ///
    /// The entry is recorded at the review and at the assignment root.
    pub fn update_review(
        &self,
        assignment_id: &str,
        patient_id: &str,
        updates: &[ReviewUpdate],
        actor: &Actor,
        token: Option<&str>,
    ) -> EngineResult<MutationOutcome<QaAssignment>> {
        ensure_actor(actor)?;
        if let Some(aggregate) = self.replay(assignment_id, token)? {
            return Ok(MutationOutcome {
                aggregate,
                entry: None,
            });
        }
        let mut assignment: QaAssignment = self.load_required(assignment_id)?;

        let review = locate::review_mut(&mut assignment, patient_id)?;
        let changes = diff::diff_review(review, updates);
        if changes.is_empty() && self.policy.skip_noop_updates {
            debug!("update_review {}: no field changed, skipping", patient_id);
            return Ok(MutationOutcome {
                aggregate: assignment,
                entry: None,
            });
        }
        diff::apply_review(review, updates);

        let entry = AuditEntry::new(actor, AuditAction::Update, changes);
        review.audit_log.record(entry.clone());
        assignment.audit_log.record(entry.clone());

        self.persist(&mut assignment, token)?;
        Ok(MutationOutcome {
            aggregate: assignment,
            entry: Some(entry),
        })
    }

    /// Update assignment root fields. The entry lands at the root log only.
    pub fn update_assignment(
        &self,
        assignment_id: &str,
        updates: &[AssignmentUpdate],
        actor: &Actor,
        token: Option<&str>,
    ) -> EngineResult<MutationOutcome<QaAssignment>> {
        ensure_actor(actor)?;
        if let Some(aggregate) = self.replay(assignment_id, token)? {
            return Ok(MutationOutcome {
                aggregate,
                entry: None,
            });
        }
        let mut assignment: QaAssignment = self.load_required(assignment_id)?;

        let changes = diff::diff_assignment(&assignment, updates);
        if changes.is_empty() && self.policy.skip_noop_updates {
            debug!(
                "update_assignment {}: no field changed, skipping",
                assignment_id
            );
            return Ok(MutationOutcome {
                aggregate: assignment,
                entry: None,
            });
        }
        diff::apply_assignment(&mut assignment, updates);

        let entry = AuditEntry::new(actor, AuditAction::Update, changes);
        assignment.audit_log.record(entry.clone());

        self.persist(&mut assignment, token)?;
        Ok(MutationOutcome {
            aggregate: assignment,
            entry: Some(entry),
        })
    }

    /// Add a requirement document slot to a patient review.
    ///
    /// Fails with [`EngineError::RecordExists`] when the slot is already
    /// present: overwriting would silently destroy its audit history.
    pub fn add_document(
        &self,
        assignment_id: &str,
        patient_id: &str,
        mut document: QaDocument,
        actor: &Actor,
        token: Option<&str>,
    ) -> EngineResult<MutationOutcome<QaAssignment>> {
        ensure_actor(actor)?;
        if let Some(aggregate) = self.replay(assignment_id, token)? {
            return Ok(MutationOutcome {
                aggregate,
                entry: None,
            });
        }
        let mut assignment: QaAssignment = self.load_required(assignment_id)?;

        let review = locate::review_mut(&mut assignment, patient_id)?;
        if review.documents.contains_key(&document.requirement_id) {
            return Err(EngineError::RecordExists(format!(
                "document {} already on patient {}",
                document.requirement_id, patient_id
            )));
        }

        document
            .audit_log
            .record(AuditEntry::new(actor, AuditAction::Create, vec![]));
        let entry = AuditEntry::new(
            actor,
            AuditAction::Update,
            vec![FieldChange::new(
                "documents",
                Value::Null,
                json!({ "added": document.requirement_id.clone() }),
            )],
        );
        review
            .documents
            .insert(document.requirement_id.clone(), document);
        review.audit_log.record(entry.clone());
        assignment.audit_log.record(entry.clone());

        self.persist(&mut assignment, token)?;
        debug!(
            "added document to patient {} on assignment {}",
            patient_id, assignment_id
        );
        Ok(MutationOutcome {
            aggregate: assignment,
            entry: Some(entry),
        })
    }

    /// Remove a requirement document slot outright.
    ///
    /// The slot's own audit log is deleted with it; entries previously
    /// cascaded to the review and root logs remain. No removal entry is
    /// recorded.
    pub fn remove_document(
        &self,
        assignment_id: &str,
        patient_id: &str,
        requirement_id: &str,
        actor: &Actor,
    ) -> EngineResult<MutationOutcome<QaAssignment>> {
        ensure_actor(actor)?;
        let mut assignment: QaAssignment = self.load_required(assignment_id)?;

        let review = locate::review_mut(&mut assignment, patient_id)?;
        if review.documents.remove(requirement_id).is_none() {
            return Err(LocateError::DocumentNotFound(
                requirement_id.to_string(),
                patient_id.to_string(),
            )
            .into());
        }

        self.persist(&mut assignment, None)?;
        debug!(
            "removed document {} from assignment {}",
            requirement_id, assignment_id
        );
        Ok(MutationOutcome {
            aggregate: assignment,
            entry: None,
        })
    }
}
