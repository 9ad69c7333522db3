//! Response aggregation.
//!
//! Turns the stored entries of a form into a per-field summary:
//! distinct answers for free-text fields, frequency tables for choice
//! fields and submission counts for file fields.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::entry::Entry;
use crate::models::field::{split_selections, ChoiceSyntax, Field, FieldKind, FieldType};

/// One option of a choice field with its tally.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ChoiceBucket {
    pub label: String,
    pub count: u64,
    /// Share of all counted selections, 0-100 rounded to two decimals.
    pub percentage: f64,
}

/// Aggregated answers of a field, shaped by its kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "summary", rename_all = "snake_case")]
pub enum SummaryData {
    Values {
        answers: Vec<String>,
    },
    Choices {
        buckets: Vec<ChoiceBucket>,
        total_selections: u64,
    },
    Files {
        count: u64,
    },
}

/// Summary of one field's answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FieldSummary {
    pub field_id: Uuid,
    pub slug: String,
    pub label: String,
    pub field_type: FieldType,
    pub order: i32,
    #[serde(flatten)]
    pub data: SummaryData,
}

/// Response for a form's aggregated responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ResponsesSummary {
    pub form_id: Uuid,
    pub slug: String,
    pub title: String,
    pub total_entries: usize,
    pub fields: Vec<FieldSummary>,
}

/// Aggregates the stored values of a single field.
pub fn aggregate<'a, I>(field: &Field, values: I, syntax: &ChoiceSyntax) -> FieldSummary
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let data = match field.field_type.kind() {
        FieldKind::FreeText => distinct_answers(values),
        FieldKind::File => SummaryData::Files {
            count: values.into_iter().filter(Option::is_some).count() as u64,
        },
        FieldKind::Choice | FieldKind::Boolean => {
            tally(field.options(syntax), values.into_iter().flatten().map(str::trim))
        }
        FieldKind::MultipleChoice => {
            let options = field.options(syntax);
            let selections: Vec<&str> = values
                .into_iter()
                .flatten()
                .flat_map(|value| split_selections(value, &options))
                .collect();
            tally(options, selections.into_iter())
        }
    };

    FieldSummary {
        field_id: field.id,
        slug: field.slug.clone(),
        label: field.label.clone(),
        field_type: field.field_type,
        order: field.order,
        data,
    }
}

/// Aggregates every field of a form over its entries, in field order.
pub fn summarize(fields: &[Field], entries: &[Entry], syntax: &ChoiceSyntax) -> Vec<FieldSummary> {
    let mut values_by_field: HashMap<Uuid, Vec<Option<&str>>> = HashMap::new();
    for entry in entries {
        for field_entry in &entry.fields {
            values_by_field
                .entry(field_entry.field_id)
                .or_default()
                .push(field_entry.value.as_deref());
        }
    }

    let mut ordered: Vec<&Field> = fields.iter().collect();
    ordered.sort_by_key(|f| f.order);

    ordered
        .into_iter()
        .map(|field| {
            let values = values_by_field
                .get(&field.id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            aggregate(field, values.iter().copied(), syntax)
        })
        .collect()
}

fn distinct_answers<'a, I>(values: I) -> SummaryData
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut seen = HashSet::new();
    let mut answers = Vec::new();
    for value in values.into_iter().flatten().map(str::trim) {
        if !value.is_empty() && seen.insert(value) {
            answers.push(value.to_string());
        }
    }
    SummaryData::Values { answers }
}

fn tally<'a, I>(options: Vec<String>, selections: I) -> SummaryData
where
    I: Iterator<Item = &'a str>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, option) in options.iter().enumerate() {
        index.entry(option.as_str()).or_insert(i);
    }

    let mut counts = vec![0u64; options.len()];
    let mut total_selections = 0u64;
    for selection in selections {
        // Values that are not a declared option are skipped.
        if let Some(&i) = index.get(selection) {
            counts[i] += 1;
            total_selections += 1;
        }
    }

    let buckets = options
        .into_iter()
        .zip(counts)
        .map(|(label, count)| ChoiceBucket {
            label,
            count,
            percentage: percentage(count, total_selections),
        })
        .collect();

    SummaryData::Choices {
        buckets,
        total_selections,
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::{FieldEntry, SubmittedValue};
    use crate::services::submission::{clean_submission, SubmissionRules};
    use crate::test_support::sample_field;
    use chrono::Utc;

    fn syntax() -> ChoiceSyntax {
        ChoiceSyntax::default()
    }

    fn entry_with(values: &[(Uuid, Option<&str>)]) -> Entry {
        Entry {
            id: Uuid::new_v4(),
            form_id: Uuid::nil(),
            entry_time: Utc::now(),
            fields: values
                .iter()
                .map(|(field_id, value)| FieldEntry {
                    field_id: *field_id,
                    value: value.map(str::to_string),
                })
                .collect(),
        }
    }

    fn buckets(summary: &FieldSummary) -> (Vec<(String, u64, f64)>, u64) {
        match &summary.data {
            SummaryData::Choices {
                buckets,
                total_selections,
            } => (
                buckets
                    .iter()
                    .map(|b| (b.label.clone(), b.count, b.percentage))
                    .collect(),
                *total_selections,
            ),
            other => panic!("expected choices, got {:?}", other),
        }
    }

    #[test]
    fn test_choice_aggregation_percentages() {
        let field = sample_field("Pick", FieldType::RadioMultiple, 0, "A,B");
        let values = [Some("A"), Some("A"), Some("B"), Some("")];

        let summary = aggregate(&field, values, &syntax());
        let (buckets, total) = buckets(&summary);

        assert_eq!(total, 3);
        assert_eq!(
            buckets,
            vec![("A".to_string(), 2, 66.67), ("B".to_string(), 1, 33.33)]
        );
    }

    #[test]
    fn test_choice_zero_counts_are_listed() {
        let field = sample_field("Pick", FieldType::Select, 0, "A,B,C");
        let summary = aggregate(&field, [Some("B")], &syntax());
        let (buckets, total) = buckets(&summary);

        assert_eq!(total, 1);
        assert_eq!(
            buckets,
            vec![
                ("A".to_string(), 0, 0.0),
                ("B".to_string(), 1, 100.0),
                ("C".to_string(), 0, 0.0)
            ]
        );
    }

    #[test]
    fn test_choice_with_no_selections_reports_zero_percent() {
        let field = sample_field("Pick", FieldType::Select, 0, "A,B");
        let summary = aggregate(&field, Vec::<Option<&str>>::new(), &syntax());
        let (buckets, total) = buckets(&summary);

        assert_eq!(total, 0);
        assert!(buckets.iter().all(|(_, count, pct)| *count == 0 && *pct == 0.0));
    }

    #[test]
    fn test_unknown_choice_values_are_skipped() {
        let field = sample_field("Pick", FieldType::Select, 0, "A,B");
        let summary = aggregate(&field, [Some("A"), Some("Z"), None], &syntax());
        let (buckets, total) = buckets(&summary);

        assert_eq!(total, 1);
        assert_eq!(buckets[0], ("A".to_string(), 1, 100.0));
        assert_eq!(buckets[1], ("B".to_string(), 0, 0.0));
    }

    #[test]
    fn test_single_choice_keeps_quoted_option_whole() {
        let field = sample_field("Pick", FieldType::RadioMultiple, 0, r#"a,"b,c",d"#);
        let summary = aggregate(&field, [Some("b,c"), Some("a")], &syntax());
        let (buckets, total) = buckets(&summary);

        assert_eq!(total, 2);
        assert_eq!(buckets[1], ("b,c".to_string(), 1, 50.0));
    }

    #[test]
    fn test_multiple_choice_counts_each_selection() {
        let field = sample_field("Pick", FieldType::CheckboxMultiple, 0, "A,B,C");
        let summary = aggregate(&field, [Some("A, B"), Some("B")], &syntax());
        let (buckets, total) = buckets(&summary);

        assert_eq!(total, 3);
        assert_eq!(
            buckets,
            vec![
                ("A".to_string(), 1, 33.33),
                ("B".to_string(), 2, 66.67),
                ("C".to_string(), 0, 0.0)
            ]
        );
    }

    #[test]
    fn test_multiple_choice_option_with_delimiter() {
        let field = sample_field("Pick", FieldType::CheckboxMultiple, 0, r#"a,"b,c",d"#);
        let submitted: HashMap<String, Option<SubmittedValue>> = serde_json::from_value(
            serde_json::json!({ "pick": ["b,c", "a"] }),
        )
        .unwrap();
        let cleaned =
            clean_submission(&[field.clone()], &submitted, &SubmissionRules::default()).unwrap();
        let stored = cleaned[0].value.as_deref();

        let summary = aggregate(&field, [stored, Some("b,c")], &syntax());
        let (buckets, total) = buckets(&summary);

        assert_eq!(total, 3);
        assert_eq!(
            buckets,
            vec![
                ("a".to_string(), 1, 33.33),
                ("b,c".to_string(), 2, 66.67),
                ("d".to_string(), 0, 0.0)
            ]
        );
    }

    #[test]
    fn test_checkbox_true_false_buckets() {
        let field = sample_field("Agree", FieldType::Checkbox, 0, "");
        let summary = aggregate(
            &field,
            [Some("True"), Some("False"), Some("True"), Some("True")],
            &syntax(),
        );
        let (buckets, total) = buckets(&summary);

        assert_eq!(total, 4);
        assert_eq!(
            buckets,
            vec![("True".to_string(), 3, 75.0), ("False".to_string(), 1, 25.0)]
        );
    }

    #[test]
    fn test_free_text_distinct_in_first_seen_order() {
        let field = sample_field("Comment", FieldType::Textarea, 0, "");
        let summary = aggregate(
            &field,
            [
                Some(" great "),
                Some(""),
                Some("ok"),
                None,
                Some("great"),
                Some("   "),
            ],
            &syntax(),
        );

        assert_eq!(
            summary.data,
            SummaryData::Values {
                answers: vec!["great".to_string(), "ok".to_string()]
            }
        );
    }

    #[test]
    fn test_date_fields_list_values() {
        let field = sample_field("When", FieldType::Date, 0, "");
        let summary = aggregate(&field, [Some("2024-01-01"), Some("2024-01-01")], &syntax());
        assert_eq!(
            summary.data,
            SummaryData::Values {
                answers: vec!["2024-01-01".to_string()]
            }
        );
    }

    #[test]
    fn test_file_count_over_non_null_values() {
        let field = sample_field("Upload", FieldType::File, 0, "");
        let summary = aggregate(&field, [Some("a.pdf"), None, Some("b.pdf")], &syntax());
        assert_eq!(summary.data, SummaryData::Files { count: 2 });
    }

    #[test]
    fn test_summarize_orders_by_field_order() {
        let choice = sample_field("Pick", FieldType::Select, 1, "A,B");
        let text = sample_field("Name", FieldType::Text, 0, "");
        let file = sample_field("Upload", FieldType::File, 2, "");

        let entries = vec![
            entry_with(&[(text.id, Some("Ada")), (choice.id, Some("A"))]),
            entry_with(&[
                (text.id, Some("Grace")),
                (choice.id, Some("B")),
                (file.id, Some("cv.pdf")),
            ]),
            entry_with(&[(text.id, Some("Ada")), (file.id, None)]),
        ];

        let summaries = summarize(&[choice.clone(), file.clone(), text.clone()], &entries, &syntax());
        let order: Vec<_> = summaries.iter().map(|s| s.field_id).collect();
        assert_eq!(order, vec![text.id, choice.id, file.id]);

        assert_eq!(
            summaries[0].data,
            SummaryData::Values {
                answers: vec!["Ada".to_string(), "Grace".to_string()]
            }
        );
        assert_eq!(buckets(&summaries[1]).1, 2);
        assert_eq!(summaries[2].data, SummaryData::Files { count: 1 });
    }

    #[test]
    fn test_summarize_field_without_entries() {
        let field = sample_field("Pick", FieldType::Select, 0, "A");
        let summaries = summarize(&[field], &[], &syntax());
        assert_eq!(buckets(&summaries[0]), (vec![("A".to_string(), 0, 0.0)], 0));
    }

    #[test]
    fn test_summary_serialization() {
        let field = sample_field("Upload", FieldType::File, 0, "");
        let summary = aggregate(&field, [Some("a.pdf")], &syntax());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["summary"], "files");
        assert_eq!(json["count"], 1);
        assert_eq!(json["field_type"], "file");
    }
}
