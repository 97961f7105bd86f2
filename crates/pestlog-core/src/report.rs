//! Report context projection.
//!
//! Flattens the current visit state into the payload the reporting screen
//! renders from. Pure: no I/O, no mutation, callable at any point in the
//! lifecycle.

use serde::{Deserialize, Serialize};

use crate::models::{ChemicalRecord, TreatedArea};
use crate::session::VisitSession;

/// Flat projection of a visit for the reporting collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportContext {
    pub log_id: String,
    pub visit_id: String,
    pub customer_id: String,
    pub technician_id: String,
    /// Human-readable service line, e.g. "Insecticide Treatment"
    pub service_label: String,
    /// Human-readable subtype label, when the visit has one
    pub subtype_label: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_minutes: Option<i64>,
    pub chemicals: Vec<ChemicalRecord>,
    pub treated_areas: Vec<TreatedArea>,
    pub notes: String,
}

/// Resolve a subtype code to its display label.
///
/// "other" resolves through the pest name the customer reported; unknown
/// codes fall back to a title-cased form of the code itself so new backend
/// subtypes degrade gracefully instead of rendering raw identifiers.
fn subtype_label(code: &str, other_pest_name: Option<&str>) -> String {
    match code {
        "termite" => "Termite Control".to_string(),
        "rodent" => "Rodent Control".to_string(),
        "bed_bugs" => "Bed Bug Treatment".to_string(),
        "cockroach" => "Cockroach Treatment".to_string(),
        "mosquito" => "Mosquito Control".to_string(),
        "wasp" => "Wasp Nest Removal".to_string(),
        "other" => match other_pest_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => "Other Pest".to_string(),
        },
        unknown => title_case(unknown),
    }
}

fn title_case(code: &str) -> String {
    code.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the report payload from the session's current state.
pub fn build_report_context(session: &VisitSession) -> ReportContext {
    let record = session.to_record();
    let descriptor = session.descriptor();

    ReportContext {
        log_id: record.log_id,
        visit_id: record.visit_id,
        customer_id: record.customer_id,
        technician_id: record.technician_id,
        service_label: session.service_type().label().to_string(),
        subtype_label: descriptor
            .service_subtype
            .as_deref()
            .map(|code| subtype_label(code, descriptor.other_pest_name.as_deref())),
        start_time: record.start_time,
        end_time: record.end_time,
        duration_minutes: record.duration_minutes,
        chemicals: record.chemicals,
        treated_areas: record.treated_areas,
        notes: record.notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SessionDescriptor;
    use crate::models::ServiceType;

    fn session_with_subtype(subtype: &str, pest: Option<&str>) -> VisitSession {
        VisitSession::new(
            SessionDescriptor {
                date: Some("2026-08-20".into()),
                time: Some("09:30".into()),
                service_subtype: Some(subtype.into()),
                other_pest_name: pest.map(String::from),
                ..Default::default()
            },
            None,
            Some("cust-1".into()),
            Some("tech-1".into()),
            ServiceType::SpecialService,
        )
    }

    #[test]
    fn test_known_subtype_labels() {
        assert_eq!(subtype_label("termite", None), "Termite Control");
        assert_eq!(subtype_label("bed_bugs", None), "Bed Bug Treatment");
    }

    #[test]
    fn test_other_subtype_uses_pest_name() {
        assert_eq!(
            subtype_label("other", Some("Carpenter ants")),
            "Carpenter ants"
        );
        assert_eq!(subtype_label("other", Some("  ")), "Other Pest");
        assert_eq!(subtype_label("other", None), "Other Pest");
    }

    #[test]
    fn test_unknown_subtype_is_title_cased() {
        assert_eq!(subtype_label("carpet_beetle", None), "Carpet Beetle");
    }

    #[test]
    fn test_build_context_is_pure_projection() {
        let mut session = session_with_subtype("other", Some("Silverfish"));
        session.add_chemical("Permethrin".into());
        session.set_notes("perimeter only");

        let before = session.to_record();
        let context = build_report_context(&session);
        assert_eq!(session.to_record(), before);

        assert_eq!(context.service_label, "Special Service");
        assert_eq!(context.subtype_label.as_deref(), Some("Silverfish"));
        assert_eq!(context.chemicals.len(), 1);
        assert_eq!(context.notes, "perimeter only");
    }
}
