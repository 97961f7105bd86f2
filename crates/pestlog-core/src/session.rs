//! Service visit state machine.
//!
//! One `VisitSession` per screen instance drives the
//! `NotStarted → InProgress → Completed` lifecycle for both technician
//! screens, parametrized by service type. Gateways are passed into the
//! transition methods so the session owns no connections; every gateway
//! call is caught here and converted into a typed outcome, nothing
//! propagates as an unhandled failure.

use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::gateway::{AppointmentSyncGateway, GatewayError, ServiceLogGateway};
use crate::identity::{resolve_id, SessionDescriptor};
use crate::models::{
    AppointmentRef, ChemicalRecord, RawChemical, ServiceType, ServiceVisitRecord, TreatedArea,
    VisitState,
};

/// Lifecycle failure. Sync and load failures are deliberately absent:
/// a failed appointment sync never unwinds a saved record (it surfaces as a
/// [`SyncWarning`]), and a failed resume fetch falls back to a fresh start
/// (it surfaces in [`StartOutcome`]).
#[derive(Debug, Error)]
pub enum VisitError {
    /// Customer or technician id absent at complete(); fatal to that call,
    /// no partial write is attempted
    #[error("Customer and technician must be set before saving a visit")]
    MissingIdentity,

    /// The service log save failed; state stays InProgress and the call can
    /// be retried
    #[error("Could not save the service record: {0}")]
    Persistence(String),

    /// The requested transition is not available from the current state
    #[error("Cannot {action} a visit that is {}", .state.as_str())]
    InvalidTransition {
        state: VisitState,
        action: &'static str,
    },
}

/// How `start()` resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Fresh visit, now in progress
    Started,
    /// Existing record loaded for editing; session is Completed with fields
    /// unlocked
    ResumedForEdit,
    /// The appointment pointed at an existing record but the fetch failed;
    /// a fresh in-progress visit was started instead of blocking the
    /// technician
    StartedAfterLoadFailure { message: String },
}

/// Non-fatal appointment sync failure after a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncWarning {
    /// Backend refused completion because the service price is unset;
    /// actionable by the office, surfaced distinctly
    PriceNotSet,
    /// Any other sync failure; logged, shown generically
    Other(String),
}

/// Result of a successful complete()/update().
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub log_id: String,
    pub visit_id: String,
    /// Present when the post-save appointment sync failed
    pub sync_warning: Option<SyncWarning>,
}

/// Elapsed-time counter, held only while the visit is in progress.
///
/// Display-only: the UI polls it once a second for the on-screen counter.
/// The canonical duration is computed once at complete() from the captured
/// start/end pair, never accumulated from ticks. Dropping the session (or
/// leaving InProgress by any path) releases it, so no counter outlives its
/// visit.
#[derive(Debug)]
struct ElapsedTimer {
    started: Instant,
}

impl ElapsedTimer {
    fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    fn elapsed_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// One technician's working state for one visit.
pub struct VisitSession {
    descriptor: SessionDescriptor,
    appointment: Option<AppointmentRef>,
    customer_id: Option<String>,
    technician_id: Option<String>,
    service_type: ServiceType,

    state: VisitState,
    log_id: String,
    visit_id: String,

    chemicals: Vec<ChemicalRecord>,
    areas: Vec<TreatedArea>,
    notes: String,

    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    duration_minutes: Option<i64>,
    /// Carried verbatim from a resumed record whose timestamps we could not
    /// parse; preserved on re-save rather than discarded
    loaded_start_time: Option<String>,
    loaded_end_time: Option<String>,

    timer: Option<ElapsedTimer>,
}

impl VisitSession {
    /// Build a session from externally supplied scheduling data.
    ///
    /// The record key is resolved here, once; it is stable for the life of
    /// the session no matter how many times the record is saved.
    pub fn new(
        descriptor: SessionDescriptor,
        appointment: Option<AppointmentRef>,
        customer_id: Option<String>,
        technician_id: Option<String>,
        service_type: ServiceType,
    ) -> Self {
        let log_id = resolve_id(&descriptor, customer_id.as_deref(), service_type);
        let visit_id = descriptor
            .visit_id
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| log_id.clone());

        Self {
            descriptor,
            appointment,
            customer_id,
            technician_id,
            service_type,
            state: VisitState::NotStarted,
            log_id,
            visit_id,
            chemicals: Vec::new(),
            areas: Vec::new(),
            notes: String::new(),
            start_time: None,
            end_time: None,
            duration_minutes: None,
            loaded_start_time: None,
            loaded_end_time: None,
            timer: None,
        }
    }

    /// Fill descriptor fields the caller did not supply from the appointment
    /// book. Failure is logged and ignored; the fields are cosmetic.
    pub fn hydrate_descriptor(&mut self, sync: &dyn AppointmentSyncGateway) {
        if self.descriptor.service_subtype.is_some() && self.descriptor.other_pest_name.is_some() {
            return;
        }
        let (Some(date), Some(customer_id)) =
            (self.descriptor.date.clone(), self.customer_id.clone())
        else {
            return;
        };
        match sync.find_by_date_and_customer(&date, &customer_id) {
            Ok(appointments) => self.descriptor.fill_from_appointments(&appointments),
            Err(e) => debug!("appointment lookup for descriptor hydration failed: {e}"),
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Begin the visit.
    ///
    /// If the appointment is already marked completed and carries a visit id,
    /// this resumes the recorded visit for editing instead of starting a
    /// blank one: re-opening a finished appointment must never blank out
    /// historical data. If that fetch fails, a fresh in-progress visit is
    /// started so the technician can keep working.
    pub fn start(&mut self, log: &dyn ServiceLogGateway) -> StartOutcome {
        match self.state {
            // Re-entry with data already populated must not re-initialize.
            VisitState::InProgress => return StartOutcome::Started,
            VisitState::Completed => return StartOutcome::ResumedForEdit,
            VisitState::NotStarted => {}
        }

        let resumable_visit = self
            .appointment
            .as_ref()
            .and_then(|a| a.resumable())
            .map(String::from);

        if let Some(visit_id) = resumable_visit {
            match log.get_by_visit_id(&visit_id) {
                Ok(Some(record)) => {
                    self.load_record(record);
                    self.state = VisitState::Completed;
                    return StartOutcome::ResumedForEdit;
                }
                Ok(None) => {
                    warn!("appointment references visit {visit_id} but no record was found");
                    self.begin_fresh();
                    return StartOutcome::StartedAfterLoadFailure {
                        message: format!("No saved record found for visit {visit_id}"),
                    };
                }
                Err(e) => {
                    warn!("resume-for-edit fetch failed for visit {visit_id}: {e}");
                    self.begin_fresh();
                    return StartOutcome::StartedAfterLoadFailure {
                        message: e.to_string(),
                    };
                }
            }
        }

        self.begin_fresh();
        StartOutcome::Started
    }

    fn begin_fresh(&mut self) {
        self.state = VisitState::InProgress;
        self.start_time = Some(Utc::now());
        self.end_time = None;
        self.duration_minutes = None;
        self.timer = Some(ElapsedTimer::start());
    }

    fn load_record(&mut self, record: ServiceVisitRecord) {
        self.chemicals = record.chemicals;
        self.areas = record.treated_areas;
        self.notes = record.notes;
        self.duration_minutes = record.duration_minutes;

        // Timestamps from old records may be unparseable; keep the raw
        // strings so a re-save does not lose them. No placeholder start time
        // is fabricated for records that never had one.
        self.start_time = record
            .start_time
            .as_deref()
            .and_then(parse_timestamp);
        self.loaded_start_time = record.start_time;
        self.end_time = record.end_time.as_deref().and_then(parse_timestamp);
        self.loaded_end_time = record.end_time;
    }

    /// Finish the visit and persist it.
    ///
    /// Order matters: freeze end time, compute duration, format every
    /// chemical, persist. Only on a successful save does the in-memory
    /// state advance. The appointment sync afterwards is best-effort; visit
    /// data durability takes priority over appointment bookkeeping.
    pub fn complete(
        &mut self,
        log: &dyn ServiceLogGateway,
        sync: &dyn AppointmentSyncGateway,
    ) -> Result<CompletionOutcome, VisitError> {
        if self.state != VisitState::InProgress {
            return Err(VisitError::InvalidTransition {
                state: self.state,
                action: "complete",
            });
        }
        self.require_identity()?;

        let end_time = Utc::now();
        let duration_minutes = self
            .start_time
            .map(|start| (end_time - start).num_minutes());

        let mut record = self.build_record(Some(end_time), duration_minutes);
        record.reformat();

        let receipt = log
            .save(&record)
            .map_err(|e| VisitError::Persistence(e.to_string()))?;

        // Save acknowledged; commit the transition.
        self.end_time = Some(end_time);
        self.duration_minutes = duration_minutes;
        self.chemicals = record.chemicals;
        self.areas = record.treated_areas;
        self.state = VisitState::Completed;
        self.timer = None;

        let sync_warning = self.sync_appointment(sync);
        Ok(CompletionOutcome {
            log_id: receipt.log_id,
            visit_id: self.visit_id.clone(),
            sync_warning,
        })
    }

    /// Re-save an already-completed visit under its unchanged ids.
    pub fn update(
        &mut self,
        log: &dyn ServiceLogGateway,
        sync: &dyn AppointmentSyncGateway,
    ) -> Result<CompletionOutcome, VisitError> {
        if self.state != VisitState::Completed {
            return Err(VisitError::InvalidTransition {
                state: self.state,
                action: "update",
            });
        }
        self.require_identity()?;

        // Duration is recomputed only when both endpoints are known; a
        // resumed record with no recorded start keeps whatever it had.
        let duration_minutes = match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_minutes()),
            _ => self.duration_minutes,
        };

        let mut record = self.build_record(self.end_time, duration_minutes);
        record.reformat();

        let receipt = log
            .save(&record)
            .map_err(|e| VisitError::Persistence(e.to_string()))?;

        self.duration_minutes = duration_minutes;
        self.chemicals = record.chemicals;
        self.areas = record.treated_areas;

        let sync_warning = self.sync_appointment(sync);
        Ok(CompletionOutcome {
            log_id: receipt.log_id,
            visit_id: self.visit_id.clone(),
            sync_warning,
        })
    }

    /// Abandon an in-progress visit, discarding all unsaved work.
    ///
    /// No gateway call is made; nothing is persisted while InProgress, so
    /// there is nothing to undo remotely. The UI owns the confirmation
    /// dialog; this method assumes the user already confirmed. Returns
    /// `false` (and does nothing) from any other state.
    pub fn cancel(&mut self) -> bool {
        if self.state != VisitState::InProgress {
            return false;
        }
        self.chemicals.clear();
        self.areas.clear();
        self.notes.clear();
        self.start_time = None;
        self.end_time = None;
        self.duration_minutes = None;
        self.loaded_start_time = None;
        self.loaded_end_time = None;
        self.timer = None;
        self.state = VisitState::NotStarted;
        true
    }

    fn require_identity(&self) -> Result<(), VisitError> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        if present(&self.customer_id) && present(&self.technician_id) {
            Ok(())
        } else {
            Err(VisitError::MissingIdentity)
        }
    }

    fn sync_appointment(&self, sync: &dyn AppointmentSyncGateway) -> Option<SyncWarning> {
        let appointment_id = self.descriptor.appointment_id.as_deref()?;
        match sync.mark_completed(appointment_id, &self.visit_id) {
            Ok(()) => None,
            Err(e) if e.is_price_not_set() => {
                warn!("appointment {appointment_id} completion rejected: price not set");
                Some(SyncWarning::PriceNotSet)
            }
            Err(e) => {
                warn!("appointment {appointment_id} completion sync failed: {e}");
                Some(SyncWarning::Other(e.to_string()))
            }
        }
    }

    // =========================================================================
    // Mutators (valid while InProgress, or Completed with fields unlocked)
    // =========================================================================

    /// Add a visit-level chemical; same dedupe-by-name rule as areas.
    pub fn add_chemical(&mut self, raw: RawChemical) -> bool {
        let Some(record) = ChemicalRecord::normalize(raw) else {
            return false;
        };
        if self.chemicals.iter().any(|c| c.name == record.name) {
            return false;
        }
        self.chemicals.push(record);
        true
    }

    /// Remove the visit-level chemical at `index`; out-of-range is a no-op.
    pub fn remove_chemical(&mut self, index: usize) -> Option<ChemicalRecord> {
        if index < self.chemicals.len() {
            Some(self.chemicals.remove(index))
        } else {
            None
        }
    }

    /// Add a treated area; returns its generated id.
    pub fn add_area(&mut self, name: impl Into<String>) -> String {
        let area = TreatedArea::new(name);
        let id = area.id.clone();
        self.areas.push(area);
        id
    }

    /// Mutable access to an area by id.
    pub fn area_mut(&mut self, area_id: &str) -> Option<&mut TreatedArea> {
        self.areas.iter_mut().find(|a| a.id == area_id)
    }

    /// Area edit modal save: reformat its chemicals.
    pub fn save_area(&mut self, area_id: &str) -> bool {
        match self.area_mut(area_id) {
            Some(area) => {
                area.reformat();
                true
            }
            None => false,
        }
    }

    /// Replace the visit notes.
    pub fn set_notes(&mut self, text: impl Into<String>) {
        self.notes = text.into();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> VisitState {
        self.state
    }

    pub fn log_id(&self) -> &str {
        &self.log_id
    }

    pub fn visit_id(&self) -> &str {
        &self.visit_id
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn descriptor(&self) -> &SessionDescriptor {
        &self.descriptor
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    pub fn technician_id(&self) -> Option<&str> {
        self.technician_id.as_deref()
    }

    pub fn chemicals(&self) -> &[ChemicalRecord] {
        &self.chemicals
    }

    pub fn areas(&self) -> &[TreatedArea] {
        &self.areas
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn duration_minutes(&self) -> Option<i64> {
        self.duration_minutes
    }

    /// Seconds since the visit entered InProgress; `None` otherwise.
    pub fn elapsed_seconds(&self) -> Option<u64> {
        self.timer.as_ref().map(ElapsedTimer::elapsed_seconds)
    }

    /// Recorded start time as persisted (RFC 3339).
    pub fn start_time(&self) -> Option<String> {
        self.start_time
            .map(format_timestamp)
            .or_else(|| self.loaded_start_time.clone())
    }

    /// Recorded end time as persisted (RFC 3339).
    pub fn end_time(&self) -> Option<String> {
        self.end_time
            .map(format_timestamp)
            .or_else(|| self.loaded_end_time.clone())
    }

    /// Project the current working state into a record.
    pub fn to_record(&self) -> ServiceVisitRecord {
        self.build_record(self.end_time, self.duration_minutes)
    }

    fn build_record(
        &self,
        end_time: Option<DateTime<Utc>>,
        duration_minutes: Option<i64>,
    ) -> ServiceVisitRecord {
        ServiceVisitRecord {
            log_id: self.log_id.clone(),
            visit_id: self.visit_id.clone(),
            customer_id: self.customer_id.clone().unwrap_or_default(),
            technician_id: self.technician_id.clone().unwrap_or_default(),
            service_type: self.service_type.as_str().to_string(),
            service_subtype: self.descriptor.service_subtype.clone(),
            other_pest_name: self.descriptor.other_pest_name.clone(),
            start_time: self
                .start_time
                .map(format_timestamp)
                .or_else(|| self.loaded_start_time.clone()),
            end_time: end_time
                .map(format_timestamp)
                .or_else(|| self.loaded_end_time.clone()),
            duration_minutes,
            chemicals: self.chemicals.clone(),
            treated_areas: self.areas.clone(),
            notes: self.notes.clone(),
        }
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, ServiceType};

    fn descriptor() -> SessionDescriptor {
        SessionDescriptor {
            appointment_id: Some("apt-1".into()),
            date: Some("2026-08-20".into()),
            time: Some("09:30".into()),
            ..Default::default()
        }
    }

    fn session() -> VisitSession {
        VisitSession::new(
            descriptor(),
            None,
            Some("cust-1".into()),
            Some("tech-1".into()),
            ServiceType::Insecticide,
        )
    }

    #[test]
    fn test_ids_resolved_once_at_construction() {
        let s = session();
        assert_eq!(s.log_id(), "insecticide_2026-08-20_09:30_cust-1");
        assert_eq!(s.visit_id(), s.log_id());
    }

    #[test]
    fn test_server_visit_id_used_when_present() {
        let mut d = descriptor();
        d.visit_id = Some("V7".into());
        let s = VisitSession::new(
            d,
            None,
            Some("cust-1".into()),
            Some("tech-1".into()),
            ServiceType::Insecticide,
        );
        assert_eq!(s.log_id(), "visit_V7");
        assert_eq!(s.visit_id(), "V7");
    }

    #[test]
    fn test_cancel_only_from_in_progress() {
        let mut s = session();
        assert!(!s.cancel());
        assert_eq!(s.state(), VisitState::NotStarted);
    }

    #[test]
    fn test_visit_level_chemical_dedupe() {
        let mut s = session();
        assert!(s.add_chemical("Permethrin".into()));
        assert!(!s.add_chemical("Permethrin".into()));
        assert_eq!(s.chemicals().len(), 1);
    }

    #[test]
    fn test_resumable_appointment_shape() {
        let appointment = AppointmentRef {
            appointment_id: "apt-1".into(),
            customer_id: "cust-1".into(),
            date: "2026-08-20".into(),
            time: None,
            status: AppointmentStatus::Completed,
            visit_id: Some("V1".into()),
            service_type: None,
            service_subtype: None,
            other_pest_name: None,
            service_price: None,
        };
        assert_eq!(appointment.resumable(), Some("V1"));
    }
}
