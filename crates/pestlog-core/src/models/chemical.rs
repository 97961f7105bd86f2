//! Chemical record normalization and unit formatting.
//!
//! Chemical entries arrive from three places: the technician's add-chemical
//! form, previously saved service logs, and legacy backend payloads. The
//! last two are loosely shaped (bare strings, aliased field names), so every
//! entry passes through [`ChemicalRecord::normalize`] before it touches the
//! rest of the system.

use serde::{Deserialize, Serialize};

/// Canonical chemical entry. Exactly one shape; all field-name guessing
/// happens in [`RawChemical`] and the wire adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChemicalRecord {
    /// Chemical name (non-empty once normalized)
    pub name: String,
    /// Concentration, free text; formatted form carries a single `%` suffix
    pub concentration: String,
    /// Volume, free text; formatted form carries a single `ml` suffix
    pub volume: String,
}

/// A chemical entry as it appears in loose input: either a bare name string
/// or an object whose field names drifted across app versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawChemical {
    /// Bare name, e.g. `"Permethrin"`
    Name(String),
    /// Loosely shaped object; all historical field spellings accepted
    Fields {
        #[serde(default)]
        name: Option<String>,
        #[serde(default, rename = "chemicalName", alias = "chemical_name")]
        chemical_name: Option<String>,
        #[serde(default)]
        chemical: Option<String>,
        #[serde(default)]
        concentration: Option<String>,
        #[serde(
            default,
            rename = "concentrationPercent",
            alias = "concentration_percent"
        )]
        concentration_percent: Option<String>,
        #[serde(default)]
        volume: Option<String>,
        #[serde(default, rename = "volumeMl", alias = "volume_ml")]
        volume_ml: Option<String>,
    },
}

impl From<&str> for RawChemical {
    fn from(name: &str) -> Self {
        RawChemical::Name(name.to_string())
    }
}

impl From<String> for RawChemical {
    fn from(name: String) -> Self {
        RawChemical::Name(name)
    }
}

impl RawChemical {
    /// Build a raw object entry from the add-chemical form fields.
    pub fn from_fields(name: &str, concentration: &str, volume: &str) -> Self {
        RawChemical::Fields {
            name: Some(name.to_string()),
            chemical_name: None,
            chemical: None,
            concentration: Some(concentration.to_string()),
            concentration_percent: None,
            volume: Some(volume.to_string()),
            volume_ml: None,
        }
    }
}

/// Pick the first non-empty value from a list of candidates.
fn first_non_empty(candidates: [Option<String>; 3]) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

impl ChemicalRecord {
    /// Canonicalize a raw chemical entry.
    ///
    /// Returns `None` when the resolved name is empty; callers must filter
    /// these out so garbage entries never reach persistence.
    pub fn normalize(raw: RawChemical) -> Option<ChemicalRecord> {
        let record = match raw {
            RawChemical::Name(name) => ChemicalRecord {
                name: name.trim().to_string(),
                concentration: String::new(),
                volume: String::new(),
            },
            RawChemical::Fields {
                name,
                chemical_name,
                chemical,
                concentration,
                concentration_percent,
                volume,
                volume_ml,
            } => ChemicalRecord {
                name: first_non_empty([name, chemical_name, chemical]),
                concentration: first_non_empty([concentration, concentration_percent, None]),
                volume: first_non_empty([volume, volume_ml, None]),
            },
        };

        if record.name.is_empty() {
            return None;
        }
        Some(record)
    }

    /// Apply unit suffixes in place: `%` to concentration, `ml` to volume.
    ///
    /// Formatting is re-applied at area save and at visit complete/update
    /// without tracking whether a value was already formatted, so
    /// `format(format(x)) == format(x)` must hold.
    pub fn format(&mut self) {
        self.concentration = with_suffix(&self.concentration, "%");
        self.volume = with_suffix(&self.volume, "ml");
    }

    /// Formatted copy of this record.
    pub fn formatted(&self) -> ChemicalRecord {
        let mut copy = self.clone();
        copy.format();
        copy
    }
}

/// Append `suffix` unless the trimmed value already ends with it
/// (case-insensitive, so `mL` and `ML` count). Empty values stay empty
/// rather than becoming a bare suffix.
fn with_suffix(value: &str, suffix: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.to_lowercase().ends_with(suffix) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, suffix)
    }
}
