//! Terminal rendering of datasets and fetch failures.

use console::{pad_str, style, Alignment};
use trialscope_ingestion::pipeline::FetchNotifier;
use trialscope_ingestion::sources::ConditionFetch;
use trialscope_ingestion::{TrialDataset, TrialRow};

/// Columns shown in the terminal table, with their widths.
const TABLE_COLUMNS: [(&str, usize); 6] = [
    ("NCT ID", 11),
    ("Acronym", 12),
    ("Overall Status", 22),
    ("Study Type", 10),
    ("Phases", 18),
    ("Conditions", 40),
];

fn cells(row: &TrialRow) -> [&str; 6] {
    [
        row.nct_id.as_str(),
        row.acronym.as_str(),
        row.overall_status.as_str(),
        row.study_type.as_str(),
        row.phases.as_str(),
        row.conditions.as_str(),
    ]
}

fn line<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .zip(TABLE_COLUMNS.iter())
        .map(|(v, (_, width))| pad_str(v, *width, Alignment::Left, Some("…")).into_owned())
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Fixed-width table of `rows`, header first.
pub fn render_table(rows: &[&TrialRow]) -> String {
    let mut out = line(TABLE_COLUMNS.iter().map(|(name, _)| *name));
    out.push('\n');
    for row in rows {
        out.push_str(&line(cells(row)));
        out.push('\n');
    }
    out
}

pub fn summary_line(dataset: &TrialDataset) -> String {
    format!(
        "{} studies for {}: {} PK, {} PD",
        dataset.len(),
        dataset.conditions.join(", "),
        dataset.pk_count(),
        dataset.pd_count(),
    )
}

/// Prints failed conditions to stderr as they happen.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl FetchNotifier for ConsoleNotifier {
    fn condition_failed(&self, fetch: &ConditionFetch) {
        if let Some(msg) = fetch.failure_message() {
            tracing::warn!(condition = %fetch.condition, "{msg}");
            eprintln!("{}", style(msg).red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialscope_ingestion::extract::extract;

    fn row(nct: &str, conditions: &str) -> TrialRow {
        let mut r = extract(&serde_json::json!({}));
        r.nct_id = nct.to_string();
        r.conditions = conditions.to_string();
        r.study_type = "PK".to_string();
        r
    }

    #[test]
    fn test_table_has_header_and_rows() {
        let a = row("NCT00000001", "Asthma");
        let b = row("NCT00000002", "Diabetes");
        let table = render_table(&[&a, &b]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NCT ID"));
        assert!(lines[1].starts_with("NCT00000001"));
        assert!(lines[2].ends_with("Diabetes"));
    }

    #[test]
    fn test_long_cells_are_truncated() {
        let long = "Type 2 Diabetes Mellitus With Diabetic Peripheral Angiopathy";
        let a = row("NCT00000001", long);
        let table = render_table(&[&a]);
        assert!(!table.contains(long));
        assert!(table.lines().nth(1).unwrap().ends_with('…'));
    }

    #[test]
    fn test_summary_line_counts_labels() {
        let mut b = row("NCT00000002", "Asthma");
        b.study_type = "PD".to_string();
        let data = TrialDataset::new(
            vec!["Diabetes".into(), "Asthma".into()],
            vec![row("NCT00000001", "Diabetes"), b],
        );
        assert_eq!(summary_line(&data), "2 studies for Diabetes, Asthma: 1 PK, 1 PD");
    }
}
