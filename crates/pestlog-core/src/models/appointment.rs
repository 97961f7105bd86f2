//! Appointment reference: the external scheduling record a visit fulfills.

use serde::{Deserialize, Serialize};

/// Scheduling status of an appointment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<AppointmentStatus> {
        match s {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

/// A view of the appointment book entry for a visit.
///
/// An appointment may already be marked completed (and carry a visit id)
/// by the time the technician opens the screen; the lifecycle reconciles
/// the two views via resume-for-edit rather than starting a blank record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRef {
    pub appointment_id: String,
    pub customer_id: String,
    /// Scheduled date, `YYYY-MM-DD`
    pub date: String,
    /// Scheduled time, `HH:MM`
    pub time: Option<String>,
    pub status: AppointmentStatus,
    /// Server-issued visit id, set once a visit record exists for it
    pub visit_id: Option<String>,
    pub service_type: Option<String>,
    pub service_subtype: Option<String>,
    pub other_pest_name: Option<String>,
    /// Agreed price; completion is rejected upstream while unset
    pub service_price: Option<f64>,
}

impl AppointmentRef {
    /// Whether opening this appointment should resume the recorded visit
    /// instead of starting a new one.
    pub fn resumable(&self) -> Option<&str> {
        if self.status == AppointmentStatus::Completed {
            self.visit_id.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment(status: AppointmentStatus, visit_id: Option<&str>) -> AppointmentRef {
        AppointmentRef {
            appointment_id: "apt-1".into(),
            customer_id: "cust-1".into(),
            date: "2026-08-20".into(),
            time: Some("09:30".into()),
            status,
            visit_id: visit_id.map(String::from),
            service_type: None,
            service_subtype: None,
            other_pest_name: None,
            service_price: Some(120.0),
        }
    }

    #[test]
    fn test_resumable_requires_completed_and_visit_id() {
        assert_eq!(
            appointment(AppointmentStatus::Completed, Some("V1")).resumable(),
            Some("V1")
        );
        assert_eq!(appointment(AppointmentStatus::Completed, None).resumable(), None);
        assert_eq!(
            appointment(AppointmentStatus::Scheduled, Some("V1")).resumable(),
            None
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ] {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppointmentStatus::parse("rescheduled"), None);
    }
}
