//! Treated area aggregate.

use serde::{Deserialize, Serialize};

use super::chemical::{ChemicalRecord, RawChemical};

/// A named location within a visit to which chemicals were applied.
///
/// Invariant: no two chemicals in the same area share a name (exact match).
/// [`TreatedArea::add_chemical`] is the only insertion path and enforces it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreatedArea {
    /// Locally generated id, unique per area-add event
    pub id: String,
    /// Location name as entered by the technician
    pub name: String,
    /// Applied chemicals, insertion-ordered
    pub chemicals: Vec<ChemicalRecord>,
    /// Free-text notes for this location
    pub notes: String,
}

impl TreatedArea {
    /// Create an empty area with a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            chemicals: Vec::new(),
            notes: String::new(),
        }
    }

    /// Normalize and append a chemical entry.
    ///
    /// Returns `false` without adding when the entry normalizes to nothing
    /// or when an entry with the same name is already present; duplicate
    /// dosing lines for one location are always operator error.
    pub fn add_chemical(&mut self, raw: RawChemical) -> bool {
        let Some(record) = ChemicalRecord::normalize(raw) else {
            return false;
        };
        if self.has_chemical(&record.name) {
            return false;
        }
        self.chemicals.push(record);
        true
    }

    /// Whether an entry with this exact name is already present.
    pub fn has_chemical(&self, name: &str) -> bool {
        self.chemicals.iter().any(|c| c.name == name)
    }

    /// Remove the entry at `index`. Out-of-range is a no-op.
    pub fn remove_chemical(&mut self, index: usize) -> Option<ChemicalRecord> {
        if index < self.chemicals.len() {
            Some(self.chemicals.remove(index))
        } else {
            None
        }
    }

    /// Replace the area notes.
    pub fn set_notes(&mut self, text: impl Into<String>) {
        self.notes = text.into();
    }

    /// Re-run unit formatting over every contained chemical.
    ///
    /// Applied when the area edit modal is saved: concentration/volume may
    /// have been hand-edited back to raw numbers since the last format.
    pub fn reformat(&mut self) {
        for chemical in &mut self.chemicals {
            chemical.format();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_area_ids_are_unique() {
        let a = TreatedArea::new("Kitchen");
        let b = TreatedArea::new("Kitchen");
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 36);
    }

    #[test]
    fn test_add_chemical_dedupes_by_name() {
        let mut area = TreatedArea::new("Basement");
        assert!(area.add_chemical("Permethrin".into()));
        assert!(!area.add_chemical("Permethrin".into()));
        assert!(!area.add_chemical(RawChemical::from_fields("Permethrin", "5", "100")));
        assert_eq!(area.chemicals.len(), 1);
    }

    #[test]
    fn test_add_chemical_rejects_empty_name() {
        let mut area = TreatedArea::new("Attic");
        assert!(!area.add_chemical("  ".into()));
        assert!(area.chemicals.is_empty());
    }

    #[test]
    fn test_add_chemical_preserves_insertion_order() {
        let mut area = TreatedArea::new("Garage");
        area.add_chemical("Bifenthrin".into());
        area.add_chemical("Fipronil".into());
        area.add_chemical("Deltamethrin".into());
        let names: Vec<_> = area.chemicals.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Bifenthrin", "Fipronil", "Deltamethrin"]);
    }

    #[test]
    fn test_remove_chemical_out_of_range_is_noop() {
        let mut area = TreatedArea::new("Porch");
        area.add_chemical("Bifenthrin".into());
        assert!(area.remove_chemical(5).is_none());
        assert_eq!(area.chemicals.len(), 1);
        assert!(area.remove_chemical(0).is_some());
        assert!(area.chemicals.is_empty());
    }

    #[test]
    fn test_reformat_applies_suffixes_to_all() {
        let mut area = TreatedArea::new("Crawlspace");
        area.add_chemical(RawChemical::from_fields("Bora-Care", "5", "200"));
        area.add_chemical(RawChemical::from_fields("Timbor", "10%", "50ml"));
        area.reformat();
        assert_eq!(area.chemicals[0].concentration, "5%");
        assert_eq!(area.chemicals[0].volume, "200ml");
        assert_eq!(area.chemicals[1].concentration, "10%");
        assert_eq!(area.chemicals[1].volume, "50ml");
    }
}
