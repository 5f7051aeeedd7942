//! Mutation engine integration tests.

use chrono::NaiveDate;
use serde_json::json;

use hospice_ops_core::config::{requirement_catalog, EnabledColumns, DISCHARGE_REQUIREMENT};
use hospice_ops_core::db::Database;
use hospice_ops_core::engine::{
    DocumentUpdate, EngineError, InvoiceUpdate, MutationEngine, NewAssignment, NewInvoice,
    ReviewUpdate, RosterPatient, VisitUpdate,
};
use hospice_ops_core::models::{
    ActionTaken, Actor, AuditAction, DocStatus, Invoice, InvoicePatient, InvoiceStatus,
    NoteStatus, QaAssignment, Visit, VisitType,
};
use hospice_ops_core::stats::completion_rate;

fn aug(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, day).unwrap()
}

fn biller() -> Actor {
    Actor::new("bill-2".into(), "S. Ahmed".into())
}

fn reviewer() -> Actor {
    Actor::new("qa-7".into(), "D. Reyes".into())
}

fn seed_invoice(db: &Database, rates: &[f64]) -> Invoice {
    let engine = MutationEngine::new(db);
    let mut patient = InvoicePatient::new("p-1".into(), "A. Okada".into(), "MRN-100".into());
    for (i, rate) in rates.iter().enumerate() {
        patient.visits.push(Visit::new(
            aug(i as u32 + 1),
            VisitType::Nursing,
            ActionTaken::Completed,
            "staff-1".into(),
            *rate,
        ));
    }

    engine
        .create_invoice(
            NewInvoice {
                invoice_number: "INV-2026-08".into(),
                facility_id: "fac-sv".into(),
                facility_name: "Sunnyvale".into(),
                staff_id: "staff-1".into(),
                staff_name: "M. Okafor".into(),
                period_start: aug(1),
                period_end: aug(31),
                patients: vec![patient],
            },
            &biller(),
        )
        .unwrap()
        .aggregate
}

fn seed_assignment(db: &Database, patient_count: usize) -> QaAssignment {
    let engine = MutationEngine::new(db);
    let patients = (0..patient_count)
        .map(|i| RosterPatient {
            patient_id: format!("p-{}", i + 1),
            patient_name: format!("Patient {}", i + 1),
            medical_record_number: format!("MRN-{}", 100 + i),
        })
        .collect();

    engine
        .init_assignment(
            NewAssignment {
                facility_id: "fac-sv".into(),
                facility_name: "Sunnyvale".into(),
                month: 8,
                year: 2026,
                assigned_roles: vec!["rn".into()],
                visit_volume: 0,
                patients,
            },
            &reviewer(),
        )
        .unwrap()
        .aggregate
}

#[test]
fn test_rate_update_diffs_old_and_new_and_recomputes_total() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let invoice = seed_invoice(&db, &[120.0, 140.0]);
    let visit_id = invoice.patients[0].visits[0].visit_id.clone();

    let outcome = engine
        .update_visit(
            &invoice.invoice_id,
            "p-1",
            &visit_id,
            &[VisitUpdate::Rate(150.0)],
            &biller(),
            None,
        )
        .unwrap();

    let entry = outcome.entry.unwrap();
    assert_eq!(entry.changes.len(), 1);
    assert_eq!(entry.changes[0].field, "rate");
    assert_eq!(entry.changes[0].old_value, json!(120.0));
    assert_eq!(entry.changes[0].new_value, json!(150.0));

    // The roll-up is recomputed and stored in the same unit of work
    let stored = engine.fetch_invoice(&invoice.invoice_id).unwrap();
    assert_eq!(stored.patients[0].visits[0].rate, 150.0);
    assert_eq!(stored.total_amount, 290.0);
}

#[test]
fn test_visit_entry_lands_in_visit_and_root_logs() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let invoice = seed_invoice(&db, &[120.0, 140.0]);
    let visit_id = invoice.patients[0].visits[1].visit_id.clone();

    engine
        .update_visit(
            &invoice.invoice_id,
            "p-1",
            &visit_id,
            &[
                VisitUpdate::NoteStatus(NoteStatus::Completed),
                VisitUpdate::CompletedBy(Some("staff-1".into())),
            ],
            &reviewer(),
            None,
        )
        .unwrap();

    let stored = engine.fetch_invoice(&invoice.invoice_id).unwrap();
    let visit_entry = stored.patients[0].visits[1].audit_log.latest().unwrap();
    let root_entry = stored.audit_log.latest().unwrap();

    // The same entry, not a sibling: identical id, actor, and changes
    assert_eq!(visit_entry.entry_id, root_entry.entry_id);
    assert_eq!(visit_entry.actor_id, "qa-7");
    assert_eq!(visit_entry.actor_name, "D. Reyes");
    assert_eq!(visit_entry.changes, root_entry.changes);
    assert_eq!(visit_entry.changes.len(), 2);

    // The untouched sibling visit saw nothing
    assert_eq!(stored.patients[0].visits[0].audit_log.len(), 1);
}

#[test]
fn test_document_entry_lands_in_all_three_scopes() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let assignment = seed_assignment(&db, 1);

    engine
        .update_document(
            &assignment.assignment_id,
            "p-1",
            "cti",
            &[DocumentUpdate::Status {
                status: DocStatus::Concern,
                comment: Some("missing signature page".into()),
            }],
            &reviewer(),
            None,
        )
        .unwrap();

    let stored = engine.fetch_assignment(&assignment.assignment_id).unwrap();
    let doc_entry = stored.reviews[0].documents["cti"].audit_log.latest().unwrap();
    let review_entry = stored.reviews[0].audit_log.latest().unwrap();
    let root_entry = stored.audit_log.latest().unwrap();

    assert_eq!(doc_entry.entry_id, review_entry.entry_id);
    assert_eq!(doc_entry.entry_id, root_entry.entry_id);
    assert_eq!(doc_entry.changes.len(), 1);
    assert_eq!(doc_entry.changes[0].field, "status");
    assert_eq!(doc_entry.changes[0].old_value, json!("empty"));
    assert_eq!(doc_entry.changes[0].new_value, json!("concern"));
    assert_eq!(
        doc_entry.changes[0].comment.as_deref(),
        Some("missing signature page")
    );
}

#[test]
fn test_update_after_remove_fails_without_audit_residue() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let invoice = seed_invoice(&db, &[120.0, 140.0]);
    let removed_id = invoice.patients[0].visits[0].visit_id.clone();

    engine
        .remove_visit(&invoice.invoice_id, "p-1", &removed_id, &biller())
        .unwrap();
    let before = engine.fetch_invoice(&invoice.invoice_id).unwrap();

    let result = engine.update_visit(
        &invoice.invoice_id,
        "p-1",
        &removed_id,
        &[VisitUpdate::Rate(150.0)],
        &biller(),
        None,
    );
    assert!(matches!(result, Err(EngineError::RecordNotFound(_))));

    // No audit entry was written at any scope
    let after = engine.fetch_invoice(&invoice.invoice_id).unwrap();
    assert_eq!(before, after);
    assert_eq!(after.audit_log.len(), 1);
    assert_eq!(after.patients[0].visits.len(), 1);
    assert_eq!(after.patients[0].visits[0].audit_log.len(), 1);
}

#[test]
fn test_removed_document_history_survives_in_parent_logs() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let assignment = seed_assignment(&db, 1);

    let outcome = engine
        .update_document(
            &assignment.assignment_id,
            "p-1",
            "labs",
            &[DocumentUpdate::Status {
                status: DocStatus::Completed,
                comment: None,
            }],
            &reviewer(),
            None,
        )
        .unwrap();
    let entry_id = outcome.entry.unwrap().entry_id;

    engine
        .remove_document(&assignment.assignment_id, "p-1", "labs", &reviewer())
        .unwrap();

    let stored = engine.fetch_assignment(&assignment.assignment_id).unwrap();
    assert!(!stored.reviews[0].documents.contains_key("labs"));

    // The leaf log died with the slot; the cascaded copies did not
    assert!(stored.reviews[0]
        .audit_log
        .entries()
        .iter()
        .any(|e| e.entry_id == entry_id));
    assert!(stored
        .audit_log
        .entries()
        .iter()
        .any(|e| e.entry_id == entry_id));
}

#[test]
fn test_sunnyvale_completion_walkthrough() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let assignment = seed_assignment(&db, 2);
    let all = EnabledColumns::all();

    assert_eq!(completion_rate(&assignment, &all), 0);

    engine
        .update_document(
            &assignment.assignment_id,
            "p-1",
            "lcd",
            &[DocumentUpdate::Status {
                status: DocStatus::Completed,
                comment: None,
            }],
            &reviewer(),
            None,
        )
        .unwrap();

    // 1 completed slot out of 2 patients x 19 columns
    let stored = engine.fetch_assignment(&assignment.assignment_id).unwrap();
    assert_eq!(completion_rate(&stored, &all), 3);
}

#[test]
fn test_init_assignment_seeds_full_catalog() {
    let db = Database::open_in_memory().unwrap();
    let assignment = seed_assignment(&db, 1);
    let catalog = requirement_catalog();

    let review = &assignment.reviews[0];
    assert_eq!(review.documents.len(), catalog.len());
    for requirement in &catalog {
        let doc = &review.documents[&requirement.id];
        assert!(matches!(doc.status, DocStatus::Empty));
        assert_eq!(doc.label, requirement.label);
        assert_eq!(doc.audit_log.len(), 1);
        assert!(matches!(
            doc.audit_log.latest().unwrap().action,
            AuditAction::Create
        ));
    }

    // Creation does not cascade: every scope owns a distinct entry
    assert_eq!(review.audit_log.len(), 1);
    assert_eq!(assignment.audit_log.len(), 1);
    let root_id = &assignment.audit_log.latest().unwrap().entry_id;
    assert_ne!(&review.audit_log.latest().unwrap().entry_id, root_id);
    assert_ne!(
        &review.documents["admission"].audit_log.latest().unwrap().entry_id,
        root_id
    );
}

#[test]
fn test_discharge_slot_drives_stored_census() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let assignment = seed_assignment(&db, 2);
    assert_eq!(assignment.active_count, 2);
    assert_eq!(assignment.discharged_count, 0);

    engine
        .update_document(
            &assignment.assignment_id,
            "p-1",
            DISCHARGE_REQUIREMENT,
            &[DocumentUpdate::Status {
                status: DocStatus::Completed,
                comment: None,
            }],
            &reviewer(),
            None,
        )
        .unwrap();

    let stored = engine.fetch_assignment(&assignment.assignment_id).unwrap();
    assert_eq!(stored.active_count, 1);
    assert_eq!(stored.discharged_count, 1);

    // Clearing the slot moves the patient back to the active census
    engine
        .update_document(
            &assignment.assignment_id,
            "p-1",
            DISCHARGE_REQUIREMENT,
            &[DocumentUpdate::Status {
                status: DocStatus::Empty,
                comment: None,
            }],
            &reviewer(),
            None,
        )
        .unwrap();
    let stored = engine.fetch_assignment(&assignment.assignment_id).unwrap();
    assert_eq!(stored.active_count, 2);
    assert_eq!(stored.discharged_count, 0);
}

#[test]
fn test_token_replay_returns_stored_state() -> anyhow::Result<()> {
    let db = Database::open_in_memory()?;
    let engine = MutationEngine::new(&db);
    let invoice = seed_invoice(&db, &[120.0]);
    let visit_id = invoice.patients[0].visits[0].visit_id.clone();

    let first = engine.update_visit(
        &invoice.invoice_id,
        "p-1",
        &visit_id,
        &[VisitUpdate::Rate(150.0)],
        &biller(),
        Some("tok-1"),
    )?;
    assert!(first.entry.is_some());

    // Retrying with the same token and a different payload writes nothing
    let replay = engine.update_visit(
        &invoice.invoice_id,
        "p-1",
        &visit_id,
        &[VisitUpdate::Rate(999.0)],
        &biller(),
        Some("tok-1"),
    )?;
    assert!(replay.entry.is_none());
    assert_eq!(replay.aggregate.patients[0].visits[0].rate, 150.0);

    let stored = engine.fetch_invoice(&invoice.invoice_id)?;
    assert_eq!(stored.total_amount, 150.0);
    assert_eq!(stored.audit_log.len(), 2);
    Ok(())
}

#[test]
fn test_add_visit_records_create_and_management_entries() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let invoice = seed_invoice(&db, &[120.0]);

    let visit = Visit::new(
        aug(14),
        VisitType::Chaplain,
        ActionTaken::Completed,
        "staff-3".into(),
        90.0,
    );
    let visit_id = visit.visit_id.clone();
    engine
        .add_visit(&invoice.invoice_id, "p-1", visit, &biller(), None)
        .unwrap();

    let stored = engine.fetch_invoice(&invoice.invoice_id).unwrap();
    assert_eq!(stored.patients[0].visits.len(), 2);
    assert_eq!(stored.total_amount, 210.0);

    let added = &stored.patients[0].visits[1];
    assert_eq!(added.audit_log.len(), 1);
    assert!(matches!(
        added.audit_log.latest().unwrap().action,
        AuditAction::Create
    ));

    let root_entry = stored.audit_log.latest().unwrap();
    assert!(matches!(root_entry.action, AuditAction::Update));
    assert_eq!(root_entry.changes[0].field, "visits");
    assert_eq!(root_entry.changes[0].new_value, json!({ "added": visit_id }));
}

#[test]
fn test_invoice_status_change_recorded_at_root_only() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let invoice = seed_invoice(&db, &[120.0]);

    engine
        .update_invoice(
            &invoice.invoice_id,
            &[InvoiceUpdate::Status(InvoiceStatus::Submitted)],
            &biller(),
            None,
        )
        .unwrap();

    let stored = engine.fetch_invoice(&invoice.invoice_id).unwrap();
    assert!(matches!(stored.status, InvoiceStatus::Submitted));

    let entry = stored.audit_log.latest().unwrap();
    assert_eq!(entry.changes[0].field, "status");
    assert_eq!(entry.changes[0].old_value, json!("draft"));
    assert_eq!(entry.changes[0].new_value, json!("submitted"));
    assert_eq!(stored.patients[0].visits[0].audit_log.len(), 1);
}

#[test]
fn test_review_remarks_update_fans_out_to_review_and_root() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let assignment = seed_assignment(&db, 1);

    engine
        .update_review(
            &assignment.assignment_id,
            "p-1",
            &[ReviewUpdate::Remarks(Some("chart pulled for IDG".into()))],
            &reviewer(),
            None,
        )
        .unwrap();

    let stored = engine.fetch_assignment(&assignment.assignment_id).unwrap();
    let review_entry = stored.reviews[0].audit_log.latest().unwrap();
    let root_entry = stored.audit_log.latest().unwrap();

    assert_eq!(review_entry.entry_id, root_entry.entry_id);
    assert_eq!(review_entry.changes[0].field, "remarks");
    assert_eq!(review_entry.changes[0].old_value, json!(null));
    assert_eq!(review_entry.changes[0].new_value, json!("chart pulled for IDG"));

    // Document logs are untouched by a review-level edit
    for doc in stored.reviews[0].documents.values() {
        assert_eq!(doc.audit_log.len(), 1);
    }
}

#[test]
fn test_sequential_edits_from_two_actors_accumulate() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let invoice = seed_invoice(&db, &[120.0]);
    let visit_id = invoice.patients[0].visits[0].visit_id.clone();

    engine
        .update_visit(
            &invoice.invoice_id,
            "p-1",
            &visit_id,
            &[VisitUpdate::Rate(150.0)],
            &biller(),
            None,
        )
        .unwrap();
    engine
        .update_visit(
            &invoice.invoice_id,
            "p-1",
            &visit_id,
            &[VisitUpdate::NoteStatus(NoteStatus::Approved)],
            &reviewer(),
            None,
        )
        .unwrap();

    let stored = engine.fetch_invoice(&invoice.invoice_id).unwrap();
    assert_eq!(stored.patients[0].visits[0].rate, 150.0);
    assert!(matches!(
        stored.patients[0].visits[0].note_status,
        NoteStatus::Approved
    ));

    // Newest first: reviewer's entry, then biller's, then creation
    let entries = stored.audit_log.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].actor_id, "qa-7");
    assert_eq!(entries[1].actor_id, "bill-2");
    assert!(matches!(entries[2].action, AuditAction::Create));
}

#[test]
fn test_delete_invoice_then_fetch_fails() {
    let db = Database::open_in_memory().unwrap();
    let engine = MutationEngine::new(&db);
    let invoice = seed_invoice(&db, &[120.0]);

    engine.delete_invoice(&invoice.invoice_id).unwrap();
    assert!(matches!(
        engine.fetch_invoice(&invoice.invoice_id),
        Err(EngineError::AggregateNotFound(_))
    ));
    assert!(matches!(
        engine.delete_invoice(&invoice.invoice_id),
        Err(EngineError::AggregateNotFound(_))
    ));
}

#[test]
fn test_aggregates_survive_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("hospice.db");

    let invoice_id;
    {
        let db = Database::open(&path)?;
        let engine = MutationEngine::new(&db);
        let invoice = seed_invoice(&db, &[120.0, 140.0]);
        invoice_id = invoice.invoice_id.clone();
        let visit_id = invoice.patients[0].visits[0].visit_id.clone();
        engine.update_visit(
            &invoice_id,
            "p-1",
            &visit_id,
            &[VisitUpdate::NoteStatus(NoteStatus::Approved)],
            &reviewer(),
            Some("tok-9"),
        )?;
    }

    let db = Database::open(&path)?;
    let engine = MutationEngine::new(&db);
    let stored = engine.fetch_invoice(&invoice_id)?;
    assert!(matches!(
        stored.patients[0].visits[0].note_status,
        NoteStatus::Approved
    ));
    assert_eq!(stored.audit_log.len(), 2);
    assert!(db.token_applied("tok-9")?);
    Ok(())
}
