//! Hospice-Ops Core Library
//!
//! Audit-trailed record management for hospice billing invoices and monthly
//! QA chart reviews.
//!
//! # Architecture
//!
//! ```text
//! caller (API / UI layer)
//!        │
//!        ▼
//! ┌──────────────────────────────────────┐
//! │           Mutation Engine            │
//! │  locate record → diff → apply        │
//! │  audit entry fan-out (doc/review/    │
//! │  root scopes, same entry everywhere) │
//! │  roll-up refresh (totals, census)    │
//! └──────────────────┬───────────────────┘
//!                    │ whole-aggregate save
//!                    ▼
//!           AggregateStore (SQLite)
//!                    │
//!        ┌───────────┼───────────┐
//!        ▼           ▼           ▼
//!    summaries     stats     audit views
//! ```
//!
//! # Core Principle
//!
//! **Every field mutation is recorded before it is stored.** The engine
//! captures old values from the loaded aggregate, never from caller input,
//! and a single audit entry is copied verbatim to every scope it touches.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer (aggregates as JSON documents, summaries as columns)
//! - [`models`]: Domain types (Invoice, Visit, QaAssignment, QaDocument, AuditEntry, etc.)
//! - [`engine`]: Mutation engine (diff, locate, audit fan-out, idempotency)
//! - [`stats`]: Derived aggregation (invoice totals, census counts, completion rates)
//! - [`config`]: Requirement catalog and per-facility column configuration

pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod stats;

// Re-export commonly used types
pub use config::{requirement_catalog, EnabledColumns, Requirement};
pub use db::{AssignmentSummary, Database, DbError, InvoiceSummary};
pub use engine::{
    AssignmentUpdate, DocumentUpdate, EngineError, InvoiceUpdate, MutationEngine,
    MutationOutcome, NewAssignment, NewInvoice, ReviewUpdate, RosterPatient, UpdatePolicy,
    VisitUpdate,
};
pub use models::{
    ActionTaken, Actor, AuditAction, AuditEntry, AuditLog, DocStatus, FieldChange, Invoice,
    InvoicePatient, InvoiceStatus, NoteStatus, QaAssignment, QaDocument, QaPatientReview,
    RemarkCategory, Visit, VisitType,
};
