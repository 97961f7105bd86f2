//! Visit identity resolution.
//!
//! A visit is described by two independently sourced records: the scheduling
//! data handed to the screen and whatever service log the backend may already
//! hold. `resolve_id` derives the one key that both the lookup and the write
//! use, so the same real-world visit can never fork into two records.

use crate::models::{AppointmentRef, ServiceType};

/// Scheduling data supplied by the caller when a screen opens.
///
/// Every field is optional: screens are routinely opened from push
/// notifications or list rows that carry only part of the appointment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionDescriptor {
    /// Appointment book id, when the screen was opened from an appointment
    pub appointment_id: Option<String>,
    /// Server-issued visit id, present once the backend knows the visit
    pub visit_id: Option<String>,
    /// Scheduled date, `YYYY-MM-DD`
    pub date: Option<String>,
    /// Scheduled time, `HH:MM`
    pub time: Option<String>,
    pub service_subtype: Option<String>,
    pub other_pest_name: Option<String>,
}

impl SessionDescriptor {
    /// Fill missing `service_subtype`/`other_pest_name` from the appointment
    /// book. Used when the descriptor came from a source that dropped them
    /// (e.g. a notification deep link).
    pub fn fill_from_appointments(&mut self, appointments: &[AppointmentRef]) {
        for appointment in appointments {
            if self.service_subtype.is_none() {
                self.service_subtype = appointment.service_subtype.clone();
            }
            if self.other_pest_name.is_none() {
                self.other_pest_name = appointment.other_pest_name.clone();
            }
            if self.service_subtype.is_some() && self.other_pest_name.is_some() {
                break;
            }
        }
    }
}

/// Derive the stable record key for a visit.
///
/// A server-confirmed visit id always wins; it guarantees one record per
/// real backend visit. Without one, the key is a composite of service type,
/// date, time and customer, with the literal `NA` standing in for anything
/// missing so the function never fails on partial data.
///
/// Deterministic by construction: the same key is used both to look up a
/// prior record and to write a new one, and any nondeterminism here would
/// silently fork a visit after an app restart.
///
/// Two distinct appointments sharing (type, date, time, customer) without a
/// server visit id will collide; accepted as a best-effort fallback.
pub fn resolve_id(
    descriptor: &SessionDescriptor,
    customer_id: Option<&str>,
    service_type: ServiceType,
) -> String {
    if let Some(visit_id) = non_empty(descriptor.visit_id.as_deref()) {
        return format!("visit_{}", visit_id);
    }

    format!(
        "{}_{}_{}_{}",
        service_type.as_str(),
        non_empty(descriptor.date.as_deref()).unwrap_or("NA"),
        non_empty(descriptor.time.as_deref()).unwrap_or("NA"),
        non_empty(customer_id).unwrap_or("NA"),
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;

    #[test]
    fn test_server_visit_id_wins() {
        let descriptor = SessionDescriptor {
            visit_id: Some("V42".into()),
            date: Some("2026-08-20".into()),
            time: Some("09:30".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_id(&descriptor, Some("cust-7"), ServiceType::Insecticide),
            "visit_V42"
        );
    }

    #[test]
    fn test_composite_fallback() {
        let descriptor = SessionDescriptor {
            date: Some("2026-08-20".into()),
            time: Some("09:30".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_id(&descriptor, Some("cust-7"), ServiceType::SpecialService),
            "special_service_2026-08-20_09:30_cust-7"
        );
    }

    #[test]
    fn test_missing_components_become_na() {
        let descriptor = SessionDescriptor::default();
        assert_eq!(
            resolve_id(&descriptor, None, ServiceType::Insecticide),
            "insecticide_NA_NA_NA"
        );

        let descriptor = SessionDescriptor {
            visit_id: Some("  ".into()),
            time: Some("".into()),
            date: Some("2026-08-20".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_id(&descriptor, Some("cust-7"), ServiceType::Insecticide),
            "insecticide_2026-08-20_NA_cust-7"
        );
    }

    #[test]
    fn test_deterministic() {
        let descriptor = SessionDescriptor {
            date: Some("2026-08-20".into()),
            time: Some("14:00".into()),
            ..Default::default()
        };
        let a = resolve_id(&descriptor, Some("cust-1"), ServiceType::Insecticide);
        let b = resolve_id(&descriptor, Some("cust-1"), ServiceType::Insecticide);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fill_from_appointments_takes_first_present() {
        let mut descriptor = SessionDescriptor::default();
        let appointments = vec![
            AppointmentRef {
                appointment_id: "apt-1".into(),
                customer_id: "cust-1".into(),
                date: "2026-08-20".into(),
                time: None,
                status: AppointmentStatus::Scheduled,
                visit_id: None,
                service_type: None,
                service_subtype: None,
                other_pest_name: None,
                service_price: None,
            },
            AppointmentRef {
                appointment_id: "apt-2".into(),
                customer_id: "cust-1".into(),
                date: "2026-08-20".into(),
                time: None,
                status: AppointmentStatus::Scheduled,
                visit_id: None,
                service_type: Some("special_service".into()),
                service_subtype: Some("other".into()),
                other_pest_name: Some("Carpenter ants".into()),
                service_price: None,
            },
        ];

        descriptor.fill_from_appointments(&appointments);
        assert_eq!(descriptor.service_subtype.as_deref(), Some("other"));
        assert_eq!(descriptor.other_pest_name.as_deref(), Some("Carpenter ants"));
    }
}
