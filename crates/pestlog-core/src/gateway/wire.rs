//! Wire-shape adapter for service log payloads.
//!
//! Backend responses and rows written by older app versions arrive in either
//! snake_case (`chemicals_used`, `service_start_time`) or camelCase
//! (`chemicalsUsed`, `serviceStartTime`). Accepting both is a compatibility
//! contract, and it is confined to this module: the rest of the crate only
//! ever sees [`ServiceVisitRecord`].

use serde::{Deserialize, Serialize};

use crate::models::{ChemicalRecord, RawChemical, ServiceVisitRecord, TreatedArea};

/// A service log as it appears on the wire. Every field is optional and
/// every historical spelling is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireServiceLog {
    #[serde(default, alias = "logId")]
    pub log_id: Option<String>,
    #[serde(default, alias = "visitId")]
    pub visit_id: Option<String>,
    #[serde(default, alias = "customerId")]
    pub customer_id: Option<String>,
    #[serde(default, alias = "technicianId")]
    pub technician_id: Option<String>,
    #[serde(default, alias = "serviceType")]
    pub service_type: Option<String>,
    #[serde(default, alias = "serviceSubtype")]
    pub service_subtype: Option<String>,
    #[serde(default, alias = "otherPestName")]
    pub other_pest_name: Option<String>,
    #[serde(default, alias = "serviceStartTime", alias = "startTime")]
    pub service_start_time: Option<String>,
    #[serde(default, alias = "serviceEndTime", alias = "endTime")]
    pub service_end_time: Option<String>,
    #[serde(default, alias = "durationMinutes", alias = "duration")]
    pub duration_minutes: Option<i64>,
    #[serde(default, alias = "chemicalsUsed", alias = "chemicals")]
    pub chemicals_used: Vec<RawChemical>,
    #[serde(default, alias = "treatedAreas")]
    pub treated_areas: Vec<WireTreatedArea>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A treated area as it appears on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireTreatedArea {
    #[serde(default, alias = "areaId")]
    pub id: Option<String>,
    #[serde(default, alias = "areaName")]
    pub name: Option<String>,
    #[serde(default, alias = "chemicalsUsed", alias = "chemicals_used")]
    pub chemicals: Vec<RawChemical>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl WireTreatedArea {
    fn into_area(self) -> TreatedArea {
        let mut area = TreatedArea::new(self.name.unwrap_or_default());
        if let Some(id) = self.id.filter(|id| !id.is_empty()) {
            area.id = id;
        }
        for raw in self.chemicals {
            area.add_chemical(raw);
        }
        area.notes = self.notes.unwrap_or_default();
        area
    }
}

impl WireServiceLog {
    /// Convert to the canonical record, dropping entries that normalize to
    /// nothing. Missing identity fields become empty strings; the session
    /// keeps its own resolved ids regardless of what the wire carried.
    pub fn into_record(self) -> ServiceVisitRecord {
        let chemicals: Vec<ChemicalRecord> = self
            .chemicals_used
            .into_iter()
            .filter_map(ChemicalRecord::normalize)
            .collect();

        let treated_areas: Vec<TreatedArea> = self
            .treated_areas
            .into_iter()
            .map(WireTreatedArea::into_area)
            .collect();

        ServiceVisitRecord {
            log_id: self.log_id.unwrap_or_default(),
            visit_id: self.visit_id.unwrap_or_default(),
            customer_id: self.customer_id.unwrap_or_default(),
            technician_id: self.technician_id.unwrap_or_default(),
            service_type: self.service_type.unwrap_or_default(),
            service_subtype: self.service_subtype,
            other_pest_name: self.other_pest_name,
            start_time: self.service_start_time,
            end_time: self.service_end_time,
            duration_minutes: self.duration_minutes,
            chemicals,
            treated_areas,
            notes: self.notes.unwrap_or_default(),
        }
    }
}

impl From<&ServiceVisitRecord> for WireServiceLog {
    /// Canonical snake_case wire form, used when persisting.
    fn from(record: &ServiceVisitRecord) -> Self {
        WireServiceLog {
            log_id: Some(record.log_id.clone()),
            visit_id: Some(record.visit_id.clone()),
            customer_id: Some(record.customer_id.clone()),
            technician_id: Some(record.technician_id.clone()),
            service_type: Some(record.service_type.clone()),
            service_subtype: record.service_subtype.clone(),
            other_pest_name: record.other_pest_name.clone(),
            service_start_time: record.start_time.clone(),
            service_end_time: record.end_time.clone(),
            duration_minutes: record.duration_minutes,
            chemicals_used: record
                .chemicals
                .iter()
                .map(|c| RawChemical::from_fields(&c.name, &c.concentration, &c.volume))
                .collect(),
            treated_areas: record
                .treated_areas
                .iter()
                .map(|area| WireTreatedArea {
                    id: Some(area.id.clone()),
                    name: Some(area.name.clone()),
                    chemicals: area
                        .chemicals
                        .iter()
                        .map(|c| RawChemical::from_fields(&c.name, &c.concentration, &c.volume))
                        .collect(),
                    notes: Some(area.notes.clone()),
                })
                .collect(),
            notes: Some(record.notes.clone()),
        }
    }
}
