//! Submission cleaning.
//!
//! Validates a raw submission against the form's visible fields and
//! converts every answer into the string stored as a field entry.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::entry::{FieldEntry, SubmittedValue};
use crate::models::field::{
    ChoiceSyntax, Field, FieldKind, FieldType, CHECKBOX_FALSE, CHECKBOX_TRUE,
};
use crate::models::form::Form;
use crate::models::principal::Principal;

/// Separator used when storing multiple selections.
pub const SELECTION_SEPARATOR: &str = ", ";

/// A validation problem with one submitted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &Field, message: impl Into<String>) -> Self {
        Self {
            field: field.slug.clone(),
            message: message.into(),
        }
    }
}

/// Outcomes of a submission attempt that are not server errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Submission has invalid fields")]
    Invalid(Vec<FieldError>),

    #[error("You must be logged in to submit this form")]
    LoginRequired,

    #[error("You have already submitted this form")]
    AlreadySubmitted,
}

/// Limits applied while cleaning.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionRules {
    pub field_max_length: usize,
    pub choice_syntax: ChoiceSyntax,
}

impl Default for SubmissionRules {
    fn default() -> Self {
        Self {
            field_max_length: 2000,
            choice_syntax: ChoiceSyntax::default(),
        }
    }
}

/// A validated answer, ready to store and to include in mails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedValue {
    pub field_id: Uuid,
    pub label: String,
    pub field_type: FieldType,
    pub value: Option<String>,
}

impl From<&CleanedValue> for FieldEntry {
    fn from(cleaned: &CleanedValue) -> Self {
        FieldEntry {
            field_id: cleaned.field_id,
            value: cleaned.value.clone(),
        }
    }
}

/// Returns the user to record against the entry.
///
/// Forms without anonymous voting record the submitter, so they require
/// an authenticated principal.
pub fn submitter_for(form: &Form, principal: &Principal) -> Result<Option<Uuid>, SubmissionError> {
    if form.anonymous_vote {
        return Ok(None);
    }
    principal
        .user_id
        .map(Some)
        .ok_or(SubmissionError::LoginRequired)
}

/// Validates a submission keyed by field slug.
///
/// Only visible fields are considered; keys that match no visible field
/// are ignored. Returns the cleaned values in field order, or every
/// field error found.
pub fn clean_submission(
    fields: &[Field],
    submitted: &HashMap<String, Option<SubmittedValue>>,
    rules: &SubmissionRules,
) -> Result<Vec<CleanedValue>, SubmissionError> {
    let mut visible: Vec<&Field> = fields.iter().filter(|f| f.visible).collect();
    visible.sort_by_key(|f| f.order);

    let mut cleaned = Vec::with_capacity(visible.len());
    let mut errors = Vec::new();

    for field in visible {
        let raw = submitted.get(&field.slug).and_then(Option::as_ref);
        match clean_field(field, raw, rules) {
            Ok(value) => cleaned.push(CleanedValue {
                field_id: field.id,
                label: field.label.clone(),
                field_type: field.field_type,
                value,
            }),
            Err(error) => errors.push(error),
        }
    }

    if errors.is_empty() {
        Ok(cleaned)
    } else {
        Err(SubmissionError::Invalid(errors))
    }
}

/// The first email field with a value, used as the submitter's address.
pub fn submitter_email(cleaned: &[CleanedValue]) -> Option<&str> {
    cleaned
        .iter()
        .filter(|c| c.field_type == FieldType::Email)
        .find_map(|c| c.value.as_deref())
}

fn clean_field(
    field: &Field,
    raw: Option<&SubmittedValue>,
    rules: &SubmissionRules,
) -> Result<Option<String>, FieldError> {
    let value = match field.field_type.kind() {
        FieldKind::Boolean => Some(clean_checkbox(field, raw)?),
        FieldKind::MultipleChoice => clean_multiple(field, raw, rules)?,
        FieldKind::Choice => clean_single_choice(field, raw, rules)?,
        FieldKind::FreeText | FieldKind::File => clean_text(field, raw)?,
    };

    if let Some(v) = &value {
        if v.chars().count() > rules.field_max_length {
            return Err(FieldError::new(
                field,
                format!(
                    "Ensure this value has at most {} characters",
                    rules.field_max_length
                ),
            ));
        }
    }
    Ok(value)
}

fn required_error(field: &Field) -> FieldError {
    FieldError::new(field, "This field is required")
}

fn clean_checkbox(field: &Field, raw: Option<&SubmittedValue>) -> Result<String, FieldError> {
    let checked = match raw {
        None => false,
        Some(SubmittedValue::Flag(flag)) => *flag,
        Some(SubmittedValue::Text(text)) => {
            matches!(
                text.trim().to_lowercase().as_str(),
                "true" | "on" | "1" | "yes"
            )
        }
        Some(SubmittedValue::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(SubmittedValue::Many(_)) => {
            return Err(FieldError::new(field, "Expected a single value"));
        }
    };

    if field.required && !checked {
        return Err(required_error(field));
    }
    Ok(if checked { CHECKBOX_TRUE } else { CHECKBOX_FALSE }.to_string())
}

fn clean_multiple(
    field: &Field,
    raw: Option<&SubmittedValue>,
    rules: &SubmissionRules,
) -> Result<Option<String>, FieldError> {
    let selections: Vec<String> = match raw {
        None => Vec::new(),
        Some(SubmittedValue::Many(items)) => items.iter().map(|s| s.trim().to_string()).collect(),
        Some(SubmittedValue::Text(text)) => vec![text.trim().to_string()],
        Some(_) => return Err(FieldError::new(field, "Expected a list of choices")),
    };
    let selections: Vec<String> = selections.into_iter().filter(|s| !s.is_empty()).collect();

    if selections.is_empty() {
        return if field.required {
            Err(required_error(field))
        } else {
            Ok(None)
        };
    }

    let options = field.options(&rules.choice_syntax);
    if let Some(unknown) = selections.iter().find(|s| !options.contains(s)) {
        return Err(FieldError::new(
            field,
            format!("Select a valid choice. {} is not one of the available choices", unknown),
        ));
    }
    Ok(Some(selections.join(SELECTION_SEPARATOR)))
}

fn clean_single_choice(
    field: &Field,
    raw: Option<&SubmittedValue>,
    rules: &SubmissionRules,
) -> Result<Option<String>, FieldError> {
    let Some(choice) = clean_text(field, raw)? else {
        return Ok(None);
    };

    if !field.options(&rules.choice_syntax).contains(&choice) {
        return Err(FieldError::new(
            field,
            format!("Select a valid choice. {} is not one of the available choices", choice),
        ));
    }
    Ok(Some(choice))
}

/// Cleans a single scalar answer and checks its format.
fn clean_text(field: &Field, raw: Option<&SubmittedValue>) -> Result<Option<String>, FieldError> {
    let text = match raw {
        None => String::new(),
        Some(SubmittedValue::Text(text)) => text.trim().to_string(),
        Some(SubmittedValue::Number(n)) => n.to_string(),
        Some(_) => return Err(FieldError::new(field, "Expected a single value")),
    };

    if text.is_empty() {
        return if field.required {
            Err(required_error(field))
        } else {
            Ok(None)
        };
    }

    let valid = match field.field_type {
        FieldType::Email => shared::validation::is_email_address(&text),
        FieldType::Number => text.parse::<f64>().is_ok_and(f64::is_finite),
        FieldType::Date | FieldType::DateOfBirth => shared::validation::is_iso_date(&text),
        FieldType::DateTime => shared::validation::is_iso_datetime(&text),
        FieldType::Url => shared::validation::is_http_url(&text),
        _ => true,
    };
    if !valid {
        return Err(FieldError::new(field, invalid_message(field.field_type)));
    }
    Ok(Some(text))
}

fn invalid_message(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Email => "Enter a valid email address",
        FieldType::Number => "Enter a number",
        FieldType::Date | FieldType::DateOfBirth => "Enter a valid date (YYYY-MM-DD)",
        FieldType::DateTime => "Enter a valid date/time",
        FieldType::Url => "Enter a valid URL",
        _ => "Enter a valid value",
    }
}
