//! Pestlog Core Library
//!
//! Local-first service visit lifecycle engine for pest-control field work.
//!
//! # Architecture
//!
//! ```text
//! Scheduling data → SessionDescriptor → Identity Resolver (stable record key)
//!                                               │
//!                                         VisitSession
//!                                NotStarted → InProgress → Completed
//!                                               │
//!                 ┌─────────────────────────────┼─────────────────────────────┐
//!                 │                             │                             │
//!                 ▼                             ▼                             ▼
//!          resume-for-edit              complete()/update()            Report Context
//!      (ServiceLogGateway.get)     persist via ServiceLogGateway,       (projection)
//!                                  then best-effort appointment
//!                                  sync (mark_completed)
//! ```
//!
//! # Core Principle
//!
//! **A visit record is persisted only at the Completed transition.** Nothing
//! is written while InProgress, and the in-memory state never claims
//! Completed before the save is acknowledged.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer and local gateway implementations
//! - [`models`]: Domain types (ChemicalRecord, TreatedArea, ServiceVisitRecord, …)
//! - [`identity`]: Stable visit record key derivation
//! - [`session`]: The visit state machine
//! - [`gateway`]: Gateway traits and the tolerant wire-shape adapter
//! - [`report`]: Report context projection

pub mod db;
pub mod gateway;
pub mod identity;
pub mod models;
pub mod report;
pub mod session;

// Re-export commonly used types
pub use db::Database;
pub use gateway::{AppointmentSyncGateway, GatewayError, SaveReceipt, ServiceLogGateway};
pub use identity::{resolve_id, SessionDescriptor};
pub use models::{
    AppointmentRef, AppointmentStatus, ChemicalRecord, RawChemical, ServiceType,
    ServiceVisitRecord, TreatedArea, VisitState,
};
pub use report::{build_report_context, ReportContext};
pub use session::{CompletionOutcome, StartOutcome, SyncWarning, VisitError, VisitSession};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use db::{LocalAppointmentGateway, LocalServiceLogGateway};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PestlogError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Lifecycle error: {0}")]
    LifecycleError(String),
}

impl From<db::DbError> for PestlogError {
    fn from(e: db::DbError) -> Self {
        PestlogError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for PestlogError {
    fn from(e: serde_json::Error) -> Self {
        PestlogError::SerializationError(e.to_string())
    }
}

impl From<GatewayError> for PestlogError {
    fn from(e: GatewayError) -> Self {
        PestlogError::PersistenceError(e.to_string())
    }
}

impl From<VisitError> for PestlogError {
    fn from(e: VisitError) -> Self {
        match e {
            VisitError::MissingIdentity => PestlogError::InvalidInput(e.to_string()),
            VisitError::Persistence(message) => PestlogError::PersistenceError(message),
            VisitError::InvalidTransition { .. } => PestlogError::LifecycleError(e.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for PestlogError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PestlogError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<PestlogCore>, PestlogError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(PestlogCore {
        db: Arc::new(Mutex::new(db)),
        session: Mutex::new(None),
    }))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<PestlogCore>, PestlogError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(PestlogCore {
        db: Arc::new(Mutex::new(db)),
        session: Mutex::new(None),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe engine handle for FFI. Holds the database and the single
/// active visit session (one per screen instance).
#[derive(uniffi::Object)]
pub struct PestlogCore {
    db: Arc<Mutex<Database>>,
    session: Mutex<Option<VisitSession>>,
}

impl PestlogCore {
    fn with_session<R>(
        &self,
        f: impl FnOnce(&mut VisitSession) -> Result<R, PestlogError>,
    ) -> Result<R, PestlogError> {
        let mut guard = self.session.lock()?;
        let session = guard
            .as_mut()
            .ok_or_else(|| PestlogError::LifecycleError("No active visit session".into()))?;
        f(session)
    }
}

#[uniffi::export]
impl PestlogCore {
    // =========================================================================
    // Appointment Operations
    // =========================================================================

    /// Add or update an appointment (seeded from the scheduling backend).
    pub fn upsert_appointment(&self, appointment: FfiAppointment) -> Result<(), PestlogError> {
        let db = self.db.lock()?;
        let appointment: AppointmentRef = appointment.try_into()?;
        db.upsert_appointment(&appointment)?;
        Ok(())
    }

    /// Appointments for a customer on a date.
    pub fn find_appointments(
        &self,
        date: String,
        customer_id: String,
    ) -> Result<Vec<FfiAppointment>, PestlogError> {
        let db = self.db.lock()?;
        let appointments = db.find_appointments(&date, &customer_id)?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Instantiate the visit session from externally supplied scheduling
    /// data. Replaces any previous session on this handle.
    pub fn begin_visit(
        &self,
        descriptor: FfiSessionDescriptor,
        customer_id: Option<String>,
        technician_id: Option<String>,
        service_type: String,
    ) -> Result<FfiVisitInfo, PestlogError> {
        let service_type = ServiceType::parse(&service_type).ok_or_else(|| {
            PestlogError::InvalidInput(format!("Unknown service type: {service_type}"))
        })?;

        let db = self.db.lock()?;
        let descriptor: SessionDescriptor = descriptor.into();

        let appointment = match descriptor.appointment_id.as_deref() {
            Some(appointment_id) => db.get_appointment(appointment_id)?,
            None => None,
        };

        let mut session = VisitSession::new(
            descriptor,
            appointment,
            customer_id,
            technician_id,
            service_type,
        );
        session.hydrate_descriptor(&LocalAppointmentGateway::new(&db));

        let info = FfiVisitInfo {
            log_id: session.log_id().to_string(),
            visit_id: session.visit_id().to_string(),
            state: session.state().as_str().to_string(),
        };

        *self.session.lock()? = Some(session);
        Ok(info)
    }

    /// Begin the visit; may resume an already-completed record for editing.
    pub fn start_visit(&self) -> Result<FfiStartOutcome, PestlogError> {
        let db = self.db.lock()?;
        self.with_session(|session| {
            let log = LocalServiceLogGateway::new(&db);
            Ok(session.start(&log).into())
        })
    }

    /// Finish the visit: persist the record, then best-effort appointment
    /// sync. Fails without any write when customer/technician are missing.
    pub fn complete_visit(&self) -> Result<FfiCompletionOutcome, PestlogError> {
        let db = self.db.lock()?;
        self.with_session(|session| {
            let log = LocalServiceLogGateway::new(&db);
            let sync = LocalAppointmentGateway::new(&db);
            let outcome = session.complete(&log, &sync)?;
            Ok(outcome.into())
        })
    }

    /// Re-save an already-completed visit under its unchanged ids.
    pub fn update_visit(&self) -> Result<FfiCompletionOutcome, PestlogError> {
        let db = self.db.lock()?;
        self.with_session(|session| {
            let log = LocalServiceLogGateway::new(&db);
            let sync = LocalAppointmentGateway::new(&db);
            let outcome = session.update(&log, &sync)?;
            Ok(outcome.into())
        })
    }

    /// Abandon the in-progress visit. The caller shows the confirmation
    /// dialog first; this performs the actual (local-only) discard.
    pub fn cancel_visit(&self) -> Result<bool, PestlogError> {
        self.with_session(|session| Ok(session.cancel()))
    }

    /// Seconds since the visit entered InProgress, for the on-screen
    /// counter. `None` when no visit is running.
    pub fn elapsed_seconds(&self) -> Result<Option<u64>, PestlogError> {
        self.with_session(|session| Ok(session.elapsed_seconds()))
    }

    // =========================================================================
    // Visit Mutators
    // =========================================================================

    /// Add a visit-level chemical. Returns false for empty names and
    /// duplicates.
    pub fn add_chemical(
        &self,
        name: String,
        concentration: String,
        volume: String,
    ) -> Result<bool, PestlogError> {
        self.with_session(|session| {
            Ok(session.add_chemical(RawChemical::from_fields(&name, &concentration, &volume)))
        })
    }

    /// Remove the visit-level chemical at `index`.
    pub fn remove_chemical(&self, index: u32) -> Result<bool, PestlogError> {
        self.with_session(|session| Ok(session.remove_chemical(index as usize).is_some()))
    }

    /// Add a treated area; returns its generated id.
    pub fn add_treated_area(&self, name: String) -> Result<String, PestlogError> {
        self.with_session(|session| Ok(session.add_area(name)))
    }

    /// Add a chemical to an area. Returns false for empty names and
    /// duplicates within that area.
    pub fn add_chemical_to_area(
        &self,
        area_id: String,
        name: String,
        concentration: String,
        volume: String,
    ) -> Result<bool, PestlogError> {
        self.with_session(|session| {
            let area = session
                .area_mut(&area_id)
                .ok_or_else(|| PestlogError::NotFound(format!("area {area_id}")))?;
            Ok(area.add_chemical(RawChemical::from_fields(&name, &concentration, &volume)))
        })
    }

    /// Remove the chemical at `index` from an area.
    pub fn remove_chemical_from_area(
        &self,
        area_id: String,
        index: u32,
    ) -> Result<bool, PestlogError> {
        self.with_session(|session| {
            let area = session
                .area_mut(&area_id)
                .ok_or_else(|| PestlogError::NotFound(format!("area {area_id}")))?;
            Ok(area.remove_chemical(index as usize).is_some())
        })
    }

    /// Replace an area's notes.
    pub fn set_area_notes(&self, area_id: String, text: String) -> Result<(), PestlogError> {
        self.with_session(|session| {
            let area = session
                .area_mut(&area_id)
                .ok_or_else(|| PestlogError::NotFound(format!("area {area_id}")))?;
            area.set_notes(text);
            Ok(())
        })
    }

    /// Area edit modal save: reformat its chemicals.
    pub fn save_area(&self, area_id: String) -> Result<(), PestlogError> {
        self.with_session(|session| {
            if session.save_area(&area_id) {
                Ok(())
            } else {
                Err(PestlogError::NotFound(format!("area {area_id}")))
            }
        })
    }

    /// Replace the visit notes.
    pub fn set_visit_notes(&self, text: String) -> Result<(), PestlogError> {
        self.with_session(|session| {
            session.set_notes(text);
            Ok(())
        })
    }

    // =========================================================================
    // Projections
    // =========================================================================

    /// Current working state, for rendering.
    pub fn visit_snapshot(&self) -> Result<FfiVisitSnapshot, PestlogError> {
        self.with_session(|session| Ok(FfiVisitSnapshot::from_session(session)))
    }

    /// Flat payload for the reporting screen.
    pub fn report_context(&self) -> Result<FfiReportContext, PestlogError> {
        self.with_session(|session| Ok(build_report_context(session).into()))
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe session descriptor.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSessionDescriptor {
    pub appointment_id: Option<String>,
    pub visit_id: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub service_subtype: Option<String>,
    pub other_pest_name: Option<String>,
}

impl From<FfiSessionDescriptor> for SessionDescriptor {
    fn from(d: FfiSessionDescriptor) -> Self {
        SessionDescriptor {
            appointment_id: d.appointment_id,
            visit_id: d.visit_id,
            date: d.date,
            time: d.time,
            service_subtype: d.service_subtype,
            other_pest_name: d.other_pest_name,
        }
    }
}

/// FFI-safe appointment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub appointment_id: String,
    pub customer_id: String,
    pub date: String,
    pub time: Option<String>,
    pub status: String,
    pub visit_id: Option<String>,
    pub service_type: Option<String>,
    pub service_subtype: Option<String>,
    pub other_pest_name: Option<String>,
    pub service_price: Option<f64>,
}

impl TryFrom<FfiAppointment> for AppointmentRef {
    type Error = PestlogError;

    fn try_from(a: FfiAppointment) -> Result<Self, Self::Error> {
        let status = AppointmentStatus::parse(&a.status).ok_or_else(|| {
            PestlogError::InvalidInput(format!("Unknown appointment status: {}", a.status))
        })?;
        Ok(AppointmentRef {
            appointment_id: a.appointment_id,
            customer_id: a.customer_id,
            date: a.date,
            time: a.time,
            status,
            visit_id: a.visit_id,
            service_type: a.service_type,
            service_subtype: a.service_subtype,
            other_pest_name: a.other_pest_name,
            service_price: a.service_price,
        })
    }
}

impl From<AppointmentRef> for FfiAppointment {
    fn from(a: AppointmentRef) -> Self {
        Self {
            appointment_id: a.appointment_id,
            customer_id: a.customer_id,
            date: a.date,
            time: a.time,
            status: a.status.as_str().to_string(),
            visit_id: a.visit_id,
            service_type: a.service_type,
            service_subtype: a.service_subtype,
            other_pest_name: a.other_pest_name,
            service_price: a.service_price,
        }
    }
}

/// FFI-safe session info returned from begin_visit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitInfo {
    pub log_id: String,
    pub visit_id: String,
    pub state: String,
}

/// FFI-safe start outcome.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiStartOutcome {
    Started,
    ResumedForEdit,
    StartedAfterLoadFailure { message: String },
}

impl From<StartOutcome> for FfiStartOutcome {
    fn from(outcome: StartOutcome) -> Self {
        match outcome {
            StartOutcome::Started => FfiStartOutcome::Started,
            StartOutcome::ResumedForEdit => FfiStartOutcome::ResumedForEdit,
            StartOutcome::StartedAfterLoadFailure { message } => {
                FfiStartOutcome::StartedAfterLoadFailure { message }
            }
        }
    }
}

/// FFI-safe sync warning.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiSyncWarning {
    PriceNotSet,
    Other { message: String },
}

impl From<SyncWarning> for FfiSyncWarning {
    fn from(warning: SyncWarning) -> Self {
        match warning {
            SyncWarning::PriceNotSet => FfiSyncWarning::PriceNotSet,
            SyncWarning::Other(message) => FfiSyncWarning::Other { message },
        }
    }
}

/// FFI-safe completion outcome.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCompletionOutcome {
    pub log_id: String,
    pub visit_id: String,
    pub sync_warning: Option<FfiSyncWarning>,
}

impl From<CompletionOutcome> for FfiCompletionOutcome {
    fn from(outcome: CompletionOutcome) -> Self {
        Self {
            log_id: outcome.log_id,
            visit_id: outcome.visit_id,
            sync_warning: outcome.sync_warning.map(|w| w.into()),
        }
    }
}

/// FFI-safe chemical record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChemical {
    pub name: String,
    pub concentration: String,
    pub volume: String,
}

impl From<ChemicalRecord> for FfiChemical {
    fn from(c: ChemicalRecord) -> Self {
        Self {
            name: c.name,
            concentration: c.concentration,
            volume: c.volume,
        }
    }
}

/// FFI-safe treated area.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTreatedArea {
    pub id: String,
    pub name: String,
    pub chemicals: Vec<FfiChemical>,
    pub notes: String,
}

impl From<TreatedArea> for FfiTreatedArea {
    fn from(a: TreatedArea) -> Self {
        Self {
            id: a.id,
            name: a.name,
            chemicals: a.chemicals.into_iter().map(|c| c.into()).collect(),
            notes: a.notes,
        }
    }
}

/// FFI-safe working-state snapshot.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitSnapshot {
    pub state: String,
    pub chemicals: Vec<FfiChemical>,
    pub treated_areas: Vec<FfiTreatedArea>,
    pub notes: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_minutes: Option<i64>,
}

impl FfiVisitSnapshot {
    fn from_session(session: &VisitSession) -> Self {
        Self {
            state: session.state().as_str().to_string(),
            chemicals: session
                .chemicals()
                .iter()
                .cloned()
                .map(|c| c.into())
                .collect(),
            treated_areas: session.areas().iter().cloned().map(|a| a.into()).collect(),
            notes: session.notes().to_string(),
            start_time: session.start_time(),
            end_time: session.end_time(),
            duration_minutes: session.duration_minutes(),
        }
    }
}

/// FFI-safe report context.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReportContext {
    pub log_id: String,
    pub visit_id: String,
    pub customer_id: String,
    pub technician_id: String,
    pub service_label: String,
    pub subtype_label: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_minutes: Option<i64>,
    pub chemicals: Vec<FfiChemical>,
    pub treated_areas: Vec<FfiTreatedArea>,
    pub notes: String,
}

impl From<ReportContext> for FfiReportContext {
    fn from(context: ReportContext) -> Self {
        Self {
            log_id: context.log_id,
            visit_id: context.visit_id,
            customer_id: context.customer_id,
            technician_id: context.technician_id,
            service_label: context.service_label,
            subtype_label: context.subtype_label,
            start_time: context.start_time,
            end_time: context.end_time,
            duration_minutes: context.duration_minutes,
            chemicals: context.chemicals.into_iter().map(|c| c.into()).collect(),
            treated_areas: context
                .treated_areas
                .into_iter()
                .map(|a| a.into())
                .collect(),
            notes: context.notes,
        }
    }
}
