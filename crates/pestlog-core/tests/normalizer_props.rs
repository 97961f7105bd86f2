//! Property tests for normalization, formatting and identity derivation.

use proptest::prelude::*;

use pestlog_core::{
    resolve_id, ChemicalRecord, RawChemical, ServiceType, SessionDescriptor, TreatedArea,
};

proptest! {
    /// format(format(x)) == format(x) for arbitrary concentration/volume
    /// strings, with or without an existing suffix.
    #[test]
    fn format_is_idempotent(concentration in ".{0,24}", volume in ".{0,24}") {
        let mut record = ChemicalRecord {
            name: "Permethrin".into(),
            concentration,
            volume,
        };
        record.format();
        let once = record.clone();
        record.format();
        prop_assert_eq!(record, once);
    }

    /// Formatted values end with their unit suffix whenever non-empty.
    #[test]
    fn format_result_carries_suffix(concentration in "[0-9]{1,4}(\\.[0-9]{1,2})?") {
        let mut record = ChemicalRecord {
            name: "Bifenthrin".into(),
            concentration: concentration.clone(),
            volume: concentration,
        };
        record.format();
        prop_assert!(record.concentration.ends_with('%'));
        prop_assert!(record.volume.to_lowercase().ends_with("ml"));
    }

    /// Identical inputs always derive the identical record key.
    #[test]
    fn resolve_id_is_deterministic(
        visit_id in proptest::option::of("[A-Za-z0-9]{1,8}"),
        date in proptest::option::of("[0-9]{4}-[0-9]{2}-[0-9]{2}"),
        time in proptest::option::of("[0-9]{2}:[0-9]{2}"),
        customer in proptest::option::of("[a-z0-9-]{1,12}"),
    ) {
        let descriptor = SessionDescriptor {
            visit_id,
            date,
            time,
            ..Default::default()
        };
        let a = resolve_id(&descriptor, customer.as_deref(), ServiceType::Insecticide);
        let b = resolve_id(&descriptor, customer.as_deref(), ServiceType::Insecticide);
        prop_assert_eq!(a, b);
    }

    /// resolve_id never fails and never yields an empty key, no matter how
    /// partial the scheduling data is.
    #[test]
    fn resolve_id_total_on_partial_data(
        date in proptest::option::of(".{0,12}"),
        time in proptest::option::of(".{0,8}"),
        customer in proptest::option::of(".{0,12}"),
    ) {
        let descriptor = SessionDescriptor {
            date,
            time,
            ..Default::default()
        };
        let id = resolve_id(&descriptor, customer.as_deref(), ServiceType::SpecialService);
        prop_assert!(id.starts_with("special_service_"));
    }

    /// No add sequence can produce two chemicals with the same name in one
    /// area.
    #[test]
    fn area_never_holds_duplicate_names(names in proptest::collection::vec("[A-Za-z ]{0,12}", 0..24)) {
        let mut area = TreatedArea::new("Kitchen");
        for name in names {
            area.add_chemical(RawChemical::Name(name));
        }
        let mut seen = std::collections::HashSet::new();
        for chemical in &area.chemicals {
            prop_assert!(!chemical.name.is_empty());
            prop_assert!(seen.insert(chemical.name.clone()));
        }
    }
}

// Golden scenarios from the screens' observed behavior.

#[test]
fn normalize_bare_string_yields_name_only() {
    let record = ChemicalRecord::normalize("Permethrin".into()).unwrap();
    assert_eq!(
        record,
        ChemicalRecord {
            name: "Permethrin".into(),
            concentration: "".into(),
            volume: "".into(),
        }
    );
}

#[test]
fn normalize_then_format_concentration_percent() {
    let raw: RawChemical =
        serde_json::from_str(r#"{"name": "Bora-Care", "concentrationPercent": "5"}"#).unwrap();
    let record = ChemicalRecord::normalize(raw).unwrap().formatted();
    assert_eq!(record.concentration, "5%");
}

#[test]
fn format_does_not_double_suffix() {
    let mut record = ChemicalRecord {
        name: "Fipronil".into(),
        concentration: "9.1%".into(),
        volume: "250ml".into(),
    };
    record.format();
    assert_eq!(record.concentration, "9.1%");
    assert_eq!(record.volume, "250ml");
}
