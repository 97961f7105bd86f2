//! Gateway boundary: the two external collaborators of the visit lifecycle.
//!
//! The lifecycle only ever talks to the backend through these traits. The
//! tolerant decoding of legacy payload shapes lives in [`wire`]; everything
//! past this module sees exactly one canonical record shape.

mod wire;

pub use wire::{WireServiceLog, WireTreatedArea};

use thiserror::Error;

use crate::models::{AppointmentRef, ServiceVisitRecord};

/// Backend rejection message for completing an appointment with no price.
/// Matched case-insensitively; the UI shows an actionable message for it
/// instead of a generic sync failure.
const PRICE_NOT_SET_MESSAGE: &str = "service price must be set";

/// Gateway call failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend answered and refused the operation
    #[error("Rejected by backend: {0}")]
    Rejected(String),

    /// The call itself failed (network, storage, …)
    #[error("Gateway transport error: {0}")]
    Transport(String),

    /// The response arrived but could not be decoded
    #[error("Malformed gateway response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether this is the "Service price must be set" completion rejection.
    pub fn is_price_not_set(&self) -> bool {
        match self {
            GatewayError::Rejected(message) => {
                message.to_lowercase().contains(PRICE_NOT_SET_MESSAGE)
            }
            _ => false,
        }
    }
}

/// Acknowledgement of a persisted service log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub log_id: String,
}

/// Persist and fetch service visit records.
pub trait ServiceLogGateway {
    /// Fetch the record for a server-issued visit id, if one exists.
    fn get_by_visit_id(&self, visit_id: &str) -> Result<Option<ServiceVisitRecord>, GatewayError>;

    /// Persist the full record. Re-saving under the same `log_id` overwrites.
    fn save(&self, record: &ServiceVisitRecord) -> Result<SaveReceipt, GatewayError>;
}

/// Appointment book operations used by the lifecycle.
pub trait AppointmentSyncGateway {
    /// Mark the appointment completed and attach the visit id.
    /// Idempotent: re-invoking for an already-completed appointment succeeds.
    fn mark_completed(&self, appointment_id: &str, visit_id: &str) -> Result<(), GatewayError>;

    /// Appointments for a customer on a date; fallback source for descriptor
    /// fields the caller did not supply.
    fn find_by_date_and_customer(
        &self,
        date: &str,
        customer_id: &str,
    ) -> Result<Vec<AppointmentRef>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_not_set_detection() {
        let err = GatewayError::Rejected("Service price must be set".into());
        assert!(err.is_price_not_set());

        let err = GatewayError::Rejected("service price must be set before completion".into());
        assert!(err.is_price_not_set());

        let err = GatewayError::Rejected("appointment not found".into());
        assert!(!err.is_price_not_set());

        let err = GatewayError::Transport("Service price must be set".into());
        assert!(!err.is_price_not_set());
    }
}
