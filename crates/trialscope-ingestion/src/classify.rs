//! PK / PD study-type classification.
//!
//! The rules run in a fixed order and the first match wins. Multi-phase
//! studies such as "PHASE1, PHASE2" resolve to PK because the PHASE1 check
//! precedes the later-phase check. Observational studies are only relabelled
//! for PHASE1. Both behaviours are kept as-is so labels stay comparable with
//! previously exported datasets.

use crate::models::{TrialRow, NOT_AVAILABLE};

/// Pharmacokinetics label.
pub const PK: &str = "PK";
/// Pharmacodynamics label.
pub const PD: &str = "PD";

const INTERVENTIONAL: &str = "INTERVENTIONAL";
const OBSERVATIONAL: &str = "OBSERVATIONAL";

const EARLY_PHASE_MARKERS: &[&str] = &["PHASE1", "PHASE 1"];
const LATE_PHASE_MARKERS: &[&str] = &[
    "PHASE2", "PHASE 2", "PHASE3", "PHASE 3", "PHASE4", "PHASE 4",
];

/// Infer the study-type label for one row. Pure and total.
pub fn classify(row: &TrialRow) -> String {
    classify_fields(&row.phases, &row.study_type).to_string()
}

/// Classification over the two fields the rules read.
pub fn classify_fields<'a>(phases: &str, study_type: &'a str) -> &'a str {
    if phases == "NA" {
        return PD;
    }
    if phases.is_empty() || phases == NOT_AVAILABLE {
        return PK;
    }

    match study_type {
        INTERVENTIONAL if contains_any(phases, EARLY_PHASE_MARKERS) => PK,
        INTERVENTIONAL if contains_any(phases, LATE_PHASE_MARKERS) => PD,
        OBSERVATIONAL if contains_any(phases, EARLY_PHASE_MARKERS) => PK,
        _ => study_type,
    }
}

fn contains_any(phases: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| phases.contains(m))
}

/// Overwrite each row's `study_type` with its label.
pub fn apply_classification(rows: &mut [TrialRow]) {
    for row in rows.iter_mut() {
        row.study_type = classify(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    fn row(phases: &str, study_type: &str) -> TrialRow {
        let mut r = extract(&serde_json::json!({}));
        r.phases = phases.to_string();
        r.study_type = study_type.to_string();
        r
    }

    #[test]
    fn test_na_phase_is_pd_regardless_of_type() {
        for t in ["INTERVENTIONAL", "OBSERVATIONAL", "EXPANDED_ACCESS", "Unknown"] {
            assert_eq!(classify(&row("NA", t)), "PD");
        }
    }

    #[test]
    fn test_missing_phase_is_pk() {
        assert_eq!(classify(&row("", "OBSERVATIONAL")), "PK");
        assert_eq!(classify(&row("Not Available", "INTERVENTIONAL")), "PK");
    }

    #[test]
    fn test_interventional_phases() {
        assert_eq!(classify(&row("PHASE1", "INTERVENTIONAL")), "PK");
        assert_eq!(classify(&row("PHASE 1", "INTERVENTIONAL")), "PK");
        assert_eq!(classify(&row("PHASE3", "INTERVENTIONAL")), "PD");
        assert_eq!(classify(&row("PHASE 4", "INTERVENTIONAL")), "PD");
        assert_eq!(classify(&row("EARLY_PHASE1", "INTERVENTIONAL")), "PK");
    }

    #[test]
    fn test_multi_phase_prefers_phase1() {
        assert_eq!(classify(&row("PHASE1, PHASE2", "INTERVENTIONAL")), "PK");
        assert_eq!(classify(&row("PHASE2, PHASE3", "INTERVENTIONAL")), "PD");
    }

    #[test]
    fn test_observational_only_checks_phase1() {
        assert_eq!(classify(&row("PHASE1", "OBSERVATIONAL")), "PK");
        assert_eq!(classify(&row("PHASE2", "OBSERVATIONAL")), "OBSERVATIONAL");
    }

    #[test]
    fn test_fallback_keeps_study_type() {
        assert_eq!(classify(&row("PHASE2", "EXPANDED_ACCESS")), "EXPANDED_ACCESS");
        assert_eq!(classify(&row("UNSPECIFIED", "INTERVENTIONAL")), "INTERVENTIONAL");
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert_eq!(classify(&row("phase1", "INTERVENTIONAL")), "INTERVENTIONAL");
        assert_eq!(classify(&row("PHASE1", "interventional")), "interventional");
    }

    #[test]
    fn test_classify_is_deterministic() {
        let a = row("PHASE2, PHASE3", "INTERVENTIONAL");
        let first = classify(&a);
        let _ = classify(&row("NA", "OBSERVATIONAL"));
        assert_eq!(classify(&a.clone()), first);
    }

    #[test]
    fn test_apply_classification_overwrites_in_place() {
        let mut rows = vec![
            row("PHASE1", "INTERVENTIONAL"),
            row("PHASE2", "OBSERVATIONAL"),
            row("NA", "OBSERVATIONAL"),
        ];
        apply_classification(&mut rows);
        let labels: Vec<_> = rows.iter().map(|r| r.study_type.as_str()).collect();
        assert_eq!(labels, ["PK", "OBSERVATIONAL", "PD"]);
    }
}
