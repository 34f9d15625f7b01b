//! Data models for the trial pipeline.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::classify::{PD, PK};

/// Sentinel for absent identifiers, statuses and study types.
pub const UNKNOWN: &str = "Unknown";
/// Sentinel for absent dates.
pub const UNKNOWN_DATE: &str = "Unknown Date";
/// Sentinel for absent phase lists.
pub const NOT_AVAILABLE: &str = "Not Available";
pub const NO_CONDITIONS: &str = "No conditions listed";
pub const NO_INTERVENTIONS: &str = "No interventions listed";
pub const NO_INTERVENTION_NAME: &str = "No intervention name listed";
pub const NO_LOCATIONS: &str = "No locations listed";
pub const NO_CITY: &str = "No City";
pub const NO_COUNTRY: &str = "No Country";

/// One clinical-trial record flattened into display strings.
///
/// Every field always holds either a real value or one of the sentinels
/// above. List-valued fields are stored already joined with `", "`.
/// Serialized names are the column labels used in exported tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRow {
    #[serde(rename = "NCT ID")]
    pub nct_id: String,
    #[serde(rename = "Acronym")]
    pub acronym: String,
    #[serde(rename = "Overall Status")]
    pub overall_status: String,
    #[serde(rename = "Start Date")]
    pub start_date: String,
    #[serde(rename = "Conditions")]
    pub conditions: String,
    #[serde(rename = "Interventions")]
    pub interventions: String,
    #[serde(rename = "Locations")]
    pub locations: String,
    #[serde(rename = "Primary Completion Date")]
    pub primary_completion_date: String,
    #[serde(rename = "Study First Post Date")]
    pub study_first_post_date: String,
    #[serde(rename = "Last Update Post Date")]
    pub last_update_post_date: String,
    /// Raw registry value until classification overwrites it with a label.
    #[serde(rename = "Study Type")]
    pub study_type: String,
    #[serde(rename = "Phases")]
    pub phases: String,
}

/// Column labels in export order.
pub const COLUMNS: [&str; 12] = [
    "NCT ID",
    "Acronym",
    "Overall Status",
    "Start Date",
    "Conditions",
    "Interventions",
    "Locations",
    "Primary Completion Date",
    "Study First Post Date",
    "Last Update Post Date",
    "Study Type",
    "Phases",
];

impl TrialRow {
    /// Field values in `COLUMNS` order.
    pub fn values(&self) -> [&str; 12] {
        [
            self.nct_id.as_str(),
            self.acronym.as_str(),
            self.overall_status.as_str(),
            self.start_date.as_str(),
            self.conditions.as_str(),
            self.interventions.as_str(),
            self.locations.as_str(),
            self.primary_completion_date.as_str(),
            self.study_first_post_date.as_str(),
            self.last_update_post_date.as_str(),
            self.study_type.as_str(),
            self.phases.as_str(),
        ]
    }

    /// True when conditions or interventions mention safety (case-insensitive).
    pub fn mentions_safety(&self) -> bool {
        self.conditions.to_lowercase().contains("safety")
            || self.interventions.to_lowercase().contains("safety")
    }
}

/// Classified rows for one fetch invocation, in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialDataset {
    /// Conditions as supplied by the caller, in request order.
    pub conditions: Vec<String>,
    pub rows: Vec<TrialRow>,
}

impl TrialDataset {
    pub fn new(conditions: Vec<String>, rows: Vec<TrialRow>) -> Self {
        Self { conditions, rows }
    }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Number of rows whose study type equals `label`.
    pub fn label_count(&self, label: &str) -> usize {
        self.rows.iter().filter(|r| r.study_type == label).count()
    }

    pub fn pk_count(&self) -> usize { self.label_count(PK) }

    pub fn pd_count(&self) -> usize { self.label_count(PD) }

    /// Rows matching `filter`, preserving dataset order.
    pub fn filter(&self, filter: StudyFilter) -> Vec<&TrialRow> {
        self.rows.iter().filter(|r| filter.matches(r)).collect()
    }
}

/// Row selections offered over a classified dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyFilter {
    #[default]
    All,
    Pharmacodynamics,
    Pharmacokinetics,
    Safety,
}

impl StudyFilter {
    pub const ALL: [StudyFilter; 4] = [
        StudyFilter::All,
        StudyFilter::Pharmacodynamics,
        StudyFilter::Pharmacokinetics,
        StudyFilter::Safety,
    ];

    pub fn matches(&self, row: &TrialRow) -> bool {
        match self {
            StudyFilter::All              => true,
            StudyFilter::Pharmacodynamics => row.study_type == PD,
            StudyFilter::Pharmacokinetics => row.study_type == PK,
            StudyFilter::Safety           => row.mentions_safety(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StudyFilter::All              => "All",
            StudyFilter::Pharmacodynamics => "Pharmacodynamics (PD)",
            StudyFilter::Pharmacokinetics => "Pharmacokinetics (PK)",
            StudyFilter::Safety           => "Safety",
        }
    }
}

impl std::fmt::Display for StudyFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all"                                => Ok(StudyFilter::All),
            "pd" | "pharmacodynamics"            => Ok(StudyFilter::Pharmacodynamics),
            "pk" | "pharmacokinetics"            => Ok(StudyFilter::Pharmacokinetics),
            "safety"                             => Ok(StudyFilter::Safety),
            other => Err(format!("unknown study filter: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(nct: &str, study_type: &str, conditions: &str, interventions: &str) -> TrialRow {
        TrialRow {
            nct_id: nct.to_string(),
            acronym: UNKNOWN.to_string(),
            overall_status: "RECRUITING".to_string(),
            start_date: UNKNOWN_DATE.to_string(),
            conditions: conditions.to_string(),
            interventions: interventions.to_string(),
            locations: NO_LOCATIONS.to_string(),
            primary_completion_date: UNKNOWN_DATE.to_string(),
            study_first_post_date: UNKNOWN_DATE.to_string(),
            last_update_post_date: UNKNOWN_DATE.to_string(),
            study_type: study_type.to_string(),
            phases: NOT_AVAILABLE.to_string(),
        }
    }

    fn dataset() -> TrialDataset {
        TrialDataset::new(
            vec!["Asthma".to_string()],
            vec![
                row("NCT1", "PK", "Asthma", "Drug: X"),
                row("NCT2", "PD", "Asthma; Safety Study", "Drug: Y"),
                row("NCT3", "PK", "Asthma", "SAFETY monitoring"),
                row("NCT4", "OBSERVATIONAL", "Asthma", NO_INTERVENTIONS),
            ],
        )
    }

    #[test]
    fn test_label_counts() {
        let ds = dataset();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.pk_count(), 2);
        assert_eq!(ds.pd_count(), 1);
        assert_eq!(ds.label_count("OBSERVATIONAL"), 1);
    }

    #[test]
    fn test_filters_preserve_order() {
        let ds = dataset();
        let ids = |f: StudyFilter| ds.filter(f).iter().map(|r| r.nct_id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(StudyFilter::All), ["NCT1", "NCT2", "NCT3", "NCT4"]);
        assert_eq!(ids(StudyFilter::Pharmacokinetics), ["NCT1", "NCT3"]);
        assert_eq!(ids(StudyFilter::Pharmacodynamics), ["NCT2"]);
        assert_eq!(ids(StudyFilter::Safety), ["NCT2", "NCT3"]);
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!("PK".parse::<StudyFilter>().unwrap(), StudyFilter::Pharmacokinetics);
        assert_eq!(" safety ".parse::<StudyFilter>().unwrap(), StudyFilter::Safety);
        assert!("phase1".parse::<StudyFilter>().is_err());
    }

    #[test]
    fn test_values_follow_column_order() {
        let r = row("NCT9", "PD", "C", "I");
        let values = r.values();
        assert_eq!(values.len(), COLUMNS.len());
        assert_eq!(values[0], "NCT9");
        assert_eq!(values[10], "PD");
    }
}
