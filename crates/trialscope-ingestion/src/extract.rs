//! Field extraction from raw ClinicalTrials.gov v2 study records.
//!
//! Records arrive with any subset of modules populated. Every lookup goes
//! through `serde_json::Value` indexing, which yields `Null` for missing
//! keys, so absent paths fall through to the sentinel defaults in
//! `crate::models` instead of failing.

use serde_json::Value;

use crate::models::{
    TrialRow, NOT_AVAILABLE, NO_CITY, NO_CONDITIONS, NO_COUNTRY, NO_INTERVENTIONS,
    NO_INTERVENTION_NAME, NO_LOCATIONS, UNKNOWN, UNKNOWN_DATE,
};

const LIST_SEPARATOR: &str = ", ";

/// Flatten one raw study record into a `TrialRow`.
pub fn extract(study: &Value) -> TrialRow {
    let proto = &study["protocolSection"];
    let id_mod = &proto["identificationModule"];
    let status_mod = &proto["statusModule"];
    let cond_mod = &proto["conditionsModule"];
    let interv_mod = &proto["armsInterventionsModule"];
    let loc_mod = &proto["contactsLocationsModule"];
    let design_mod = &proto["designModule"];

    TrialRow {
        nct_id: text_or(&id_mod["nctId"], UNKNOWN),
        acronym: text_or(&id_mod["acronym"], UNKNOWN),
        overall_status: text_or(&status_mod["overallStatus"], UNKNOWN),
        start_date: date_of(&status_mod["startDateStruct"]),
        conditions: joined_or(&cond_mod["conditions"], NO_CONDITIONS),
        interventions: interventions(&interv_mod["interventions"]),
        locations: locations(&loc_mod["locations"]),
        primary_completion_date: date_of(&status_mod["primaryCompletionDateStruct"]),
        study_first_post_date: date_of(&status_mod["studyFirstPostDateStruct"]),
        last_update_post_date: date_of(&status_mod["lastUpdatePostDateStruct"]),
        study_type: text_or(&design_mod["studyType"], UNKNOWN),
        phases: joined_or(&design_mod["phases"], NOT_AVAILABLE),
    }
}

fn text_or(value: &Value, default: &str) -> String {
    value.as_str().unwrap_or(default).to_string()
}

fn date_of(date_struct: &Value) -> String {
    text_or(&date_struct["date"], UNKNOWN_DATE)
}

/// Join a string list. Only an absent (or non-list) value takes the default;
/// a present empty list joins to "".
fn joined_or(value: &Value, default: &str) -> String {
    match value.as_array() {
        Some(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
        None => default.to_string(),
    }
}

fn non_empty_list(value: &Value) -> Option<&Vec<Value>> {
    value.as_array().filter(|items| !items.is_empty())
}

fn interventions(value: &Value) -> String {
    match non_empty_list(value) {
        Some(items) => items
            .iter()
            .map(|iv| text_or(&iv["name"], NO_INTERVENTION_NAME))
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
        None => NO_INTERVENTIONS.to_string(),
    }
}

fn locations(value: &Value) -> String {
    match non_empty_list(value) {
        Some(items) => items
            .iter()
            .map(|loc| {
                format!(
                    "{} - {}",
                    loc["city"].as_str().unwrap_or(NO_CITY),
                    loc["country"].as_str().unwrap_or(NO_COUNTRY),
                )
            })
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
        None => NO_LOCATIONS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_study() -> Value {
        json!({
            "protocolSection": {
                "identificationModule": { "nctId": "NCT04956640", "acronym": "KRYSTAL" },
                "statusModule": {
                    "overallStatus": "RECRUITING",
                    "startDateStruct": { "date": "2021-07-14" },
                    "primaryCompletionDateStruct": { "date": "2025-12" },
                    "studyFirstPostDateStruct": { "date": "2021-07-15" },
                    "lastUpdatePostDateStruct": { "date": "2024-03-01" }
                },
                "conditionsModule": { "conditions": ["Asthma", "Allergic Rhinitis"] },
                "armsInterventionsModule": {
                    "interventions": [ { "name": "Budesonide" }, { "type": "DRUG" } ]
                },
                "contactsLocationsModule": {
                    "locations": [
                        { "city": "Boston", "country": "United States" },
                        { "country": "France" },
                        { "city": "Osaka" }
                    ]
                },
                "designModule": { "studyType": "INTERVENTIONAL", "phases": ["PHASE2", "PHASE3"] }
            }
        })
    }

    #[test]
    fn test_extract_full_record() {
        let row = extract(&full_study());
        assert_eq!(row.nct_id, "NCT04956640");
        assert_eq!(row.acronym, "KRYSTAL");
        assert_eq!(row.overall_status, "RECRUITING");
        assert_eq!(row.start_date, "2021-07-14");
        assert_eq!(row.conditions, "Asthma, Allergic Rhinitis");
        assert_eq!(row.interventions, "Budesonide, No intervention name listed");
        assert_eq!(
            row.locations,
            "Boston - United States, No City - France, Osaka - No Country"
        );
        assert_eq!(row.primary_completion_date, "2025-12");
        assert_eq!(row.study_first_post_date, "2021-07-15");
        assert_eq!(row.last_update_post_date, "2024-03-01");
        assert_eq!(row.study_type, "INTERVENTIONAL");
        assert_eq!(row.phases, "PHASE2, PHASE3");
    }

    #[test]
    fn test_extract_empty_record_uses_every_default() {
        for raw in [json!({}), json!({ "protocolSection": {} }), json!(null), json!("junk")] {
            let row = extract(&raw);
            assert_eq!(row.nct_id, "Unknown");
            assert_eq!(row.acronym, "Unknown");
            assert_eq!(row.overall_status, "Unknown");
            assert_eq!(row.start_date, "Unknown Date");
            assert_eq!(row.conditions, "No conditions listed");
            assert_eq!(row.interventions, "No interventions listed");
            assert_eq!(row.locations, "No locations listed");
            assert_eq!(row.primary_completion_date, "Unknown Date");
            assert_eq!(row.study_first_post_date, "Unknown Date");
            assert_eq!(row.last_update_post_date, "Unknown Date");
            assert_eq!(row.study_type, "Unknown");
            assert_eq!(row.phases, "Not Available");
        }
    }

    #[test]
    fn test_present_empty_lists() {
        let raw = json!({
            "protocolSection": {
                "conditionsModule": { "conditions": [] },
                "armsInterventionsModule": { "interventions": [] },
                "contactsLocationsModule": { "locations": [] },
                "designModule": { "phases": [] }
            }
        });
        let row = extract(&raw);
        assert_eq!(row.conditions, "");
        assert_eq!(row.phases, "");
        assert_eq!(row.interventions, "No interventions listed");
        assert_eq!(row.locations, "No locations listed");
    }

    #[test]
    fn test_date_struct_without_date() {
        let raw = json!({
            "protocolSection": {
                "statusModule": { "startDateStruct": { "type": "ESTIMATED" } }
            }
        });
        assert_eq!(extract(&raw).start_date, "Unknown Date");
    }

    #[test]
    fn test_extract_is_idempotent() {
        let raw = full_study();
        assert_eq!(extract(&raw), extract(&raw));
        let empty = json!({});
        assert_eq!(extract(&empty), extract(&empty));
    }
}
