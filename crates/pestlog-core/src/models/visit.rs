//! Service visit record and lifecycle state.

use serde::{Deserialize, Serialize};

use super::area::TreatedArea;
use super::chemical::ChemicalRecord;

/// The service line a visit belongs to. Both technician screens drive the
/// same lifecycle, parametrized by this value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceType {
    /// General insecticide treatment
    Insecticide,
    /// Special service (termite, rodent, other named pest)
    SpecialService,
}

impl ServiceType {
    /// Stable string form, used in derived record ids and persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Insecticide => "insecticide",
            ServiceType::SpecialService => "special_service",
        }
    }

    /// Human-readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Insecticide => "Insecticide Treatment",
            ServiceType::SpecialService => "Special Service",
        }
    }

    /// Parse the stable string form.
    pub fn parse(s: &str) -> Option<ServiceType> {
        match s {
            "insecticide" => Some(ServiceType::Insecticide),
            "special_service" => Some(ServiceType::SpecialService),
            _ => None,
        }
    }
}

/// Visit lifecycle state.
///
/// Editing an already-completed record does not add a state: it is
/// `Completed` with fields unlocked, and saving re-writes `Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VisitState {
    NotStarted,
    InProgress,
    Completed,
}

impl VisitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitState::NotStarted => "not_started",
            VisitState::InProgress => "in_progress",
            VisitState::Completed => "completed",
        }
    }
}

/// The persisted outcome of one service visit.
///
/// `log_id` and `visit_id` are computed once per appointment occurrence and
/// never regenerated; subsequent saves of the same visit re-write the same
/// record. Timestamps are RFC 3339 strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceVisitRecord {
    /// Stable record key (see `identity::resolve_id`)
    pub log_id: String,
    /// Server-issued visit id when known, otherwise equal to `log_id`
    pub visit_id: String,
    pub customer_id: String,
    pub technician_id: String,
    pub service_type: String,
    pub service_subtype: Option<String>,
    /// Pest name when `service_subtype` is "other"
    pub other_pest_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_minutes: Option<i64>,
    /// Visit-level chemical list (insecticide screen)
    pub chemicals: Vec<ChemicalRecord>,
    /// Per-location breakdown (special-service screen)
    pub treated_areas: Vec<TreatedArea>,
    pub notes: String,
}

impl ServiceVisitRecord {
    /// Re-run unit formatting over every chemical, at both levels.
    pub fn reformat(&mut self) {
        for chemical in &mut self.chemicals {
            chemical.format();
        }
        for area in &mut self.treated_areas {
            area.reformat();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_round_trip() {
        for ty in [ServiceType::Insecticide, ServiceType::SpecialService] {
            assert_eq!(ServiceType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(ServiceType::parse("gardening"), None);
    }

    #[test]
    fn test_record_reformat_covers_both_levels() {
        let mut area = TreatedArea::new("Kitchen");
        area.add_chemical(crate::models::RawChemical::from_fields("Timbor", "10", "50"));

        let mut record = ServiceVisitRecord {
            log_id: "l".into(),
            visit_id: "v".into(),
            customer_id: "c".into(),
            technician_id: "t".into(),
            service_type: "insecticide".into(),
            service_subtype: None,
            other_pest_name: None,
            start_time: None,
            end_time: None,
            duration_minutes: None,
            chemicals: vec![ChemicalRecord {
                name: "Permethrin".into(),
                concentration: "2.5".into(),
                volume: "100".into(),
            }],
            treated_areas: vec![area],
            notes: String::new(),
        };

        record.reformat();
        assert_eq!(record.chemicals[0].concentration, "2.5%");
        assert_eq!(record.chemicals[0].volume, "100ml");
        assert_eq!(record.treated_areas[0].chemicals[0].concentration, "10%");
    }
}
