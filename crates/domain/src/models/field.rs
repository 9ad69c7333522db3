//! Form field domain models and choice parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Delimiter between choice options and between stored multi-select values.
pub const CHOICE_DELIMITER: char = ',';

/// Labels used for checkbox fields.
pub const CHECKBOX_TRUE: &str = "True";
pub const CHECKBOX_FALSE: &str = "False";

/// Type tag of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Checkbox,
    CheckboxMultiple,
    Select,
    SelectMultiple,
    RadioMultiple,
    File,
    Date,
    DateTime,
    DateOfBirth,
    Hidden,
    Number,
    Url,
}

/// How a field's answers are validated and tabulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    FreeText,
    Choice,
    MultipleChoice,
    Boolean,
    File,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Email => "email",
            FieldType::Checkbox => "checkbox",
            FieldType::CheckboxMultiple => "checkbox_multiple",
            FieldType::Select => "select",
            FieldType::SelectMultiple => "select_multiple",
            FieldType::RadioMultiple => "radio_multiple",
            FieldType::File => "file",
            FieldType::Date => "date",
            FieldType::DateTime => "date_time",
            FieldType::DateOfBirth => "date_of_birth",
            FieldType::Hidden => "hidden",
            FieldType::Number => "number",
            FieldType::Url => "url",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldType::Select | FieldType::RadioMultiple => FieldKind::Choice,
            FieldType::CheckboxMultiple | FieldType::SelectMultiple => FieldKind::MultipleChoice,
            FieldType::Checkbox => FieldKind::Boolean,
            FieldType::File => FieldKind::File,
            FieldType::Text
            | FieldType::Textarea
            | FieldType::Email
            | FieldType::Date
            | FieldType::DateTime
            | FieldType::DateOfBirth
            | FieldType::Hidden
            | FieldType::Number
            | FieldType::Url => FieldKind::FreeText,
        }
    }

    /// Returns true if the field type takes its options from a choices string.
    pub fn has_choices(&self) -> bool {
        matches!(self.kind(), FieldKind::Choice | FieldKind::MultipleChoice)
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldType::Text),
            "textarea" => Ok(FieldType::Textarea),
            "email" => Ok(FieldType::Email),
            "checkbox" => Ok(FieldType::Checkbox),
            "checkbox_multiple" => Ok(FieldType::CheckboxMultiple),
            "select" => Ok(FieldType::Select),
            "select_multiple" => Ok(FieldType::SelectMultiple),
            "radio_multiple" => Ok(FieldType::RadioMultiple),
            "file" => Ok(FieldType::File),
            "date" => Ok(FieldType::Date),
            "date_time" => Ok(FieldType::DateTime),
            "date_of_birth" => Ok(FieldType::DateOfBirth),
            "hidden" => Ok(FieldType::Hidden),
            "number" => Ok(FieldType::Number),
            "url" => Ok(FieldType::Url),
            _ => Err(format!("Invalid field type: {}", s)),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Quote characters for options that contain the delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceSyntax {
    pub quote: char,
    pub unquote: char,
}

impl Default for ChoiceSyntax {
    fn default() -> Self {
        Self {
            quote: '"',
            unquote: '"',
        }
    }
}

/// Parses a delimited choices string into trimmed, non-empty options.
///
/// An option wrapped in `quote`/`unquote` may contain the delimiter. The
/// quote characters themselves are dropped.
pub fn parse_choices(choices: &str, syntax: &ChoiceSyntax) -> Vec<String> {
    let mut options = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in choices.chars() {
        if !quoted && c == syntax.quote {
            quoted = true;
        } else if quoted && c == syntax.unquote {
            quoted = false;
        } else if !quoted && c == CHOICE_DELIMITER {
            push_option(&mut options, &current);
            current.clear();
        } else {
            current.push(c);
        }
    }
    push_option(&mut options, &current);

    options
}

fn push_option(options: &mut Vec<String>, raw: &str) {
    let option = raw.trim();
    if !option.is_empty() {
        options.push(option.to_string());
    }
}

/// Splits a stored multi-select value back into its selections.
///
/// Declared options are matched first, longest wins, so an option that
/// contains the delimiter comes back whole. Text matching no option runs
/// to the next delimiter.
pub fn split_selections<'a>(value: &'a str, options: &[String]) -> Vec<&'a str> {
    let mut selections = Vec::new();
    let mut rest = value;

    loop {
        rest = rest.trim_start_matches(|c: char| c == CHOICE_DELIMITER || c.is_whitespace());
        if rest.is_empty() {
            break;
        }

        let len = options
            .iter()
            .filter(|o| !o.is_empty() && rest.starts_with(o.as_str()))
            .filter(|o| ends_selection(&rest[o.len()..]))
            .map(String::len)
            .max()
            .unwrap_or_else(|| rest.find(CHOICE_DELIMITER).unwrap_or(rest.len()));

        let selection = rest[..len].trim();
        if !selection.is_empty() {
            selections.push(selection);
        }
        rest = &rest[len..];
    }

    selections
}

fn ends_selection(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.is_empty() || rest.starts_with(CHOICE_DELIMITER)
}

/// A field of a user-built form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Field {
    pub id: Uuid,
    pub form_id: Uuid,
    pub label: String,
    pub slug: String,
    pub field_type: FieldType,
    pub order: i32,
    pub required: bool,
    pub visible: bool,
    pub choices: String,
    pub default_value: String,
    pub placeholder_text: Option<String>,
    pub help_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Field {
    /// Declared options for choice-like fields; empty for everything else.
    pub fn options(&self, syntax: &ChoiceSyntax) -> Vec<String> {
        match self.field_type.kind() {
            FieldKind::Boolean => vec![CHECKBOX_TRUE.to_string(), CHECKBOX_FALSE.to_string()],
            FieldKind::Choice | FieldKind::MultipleChoice => parse_choices(&self.choices, syntax),
            FieldKind::FreeText | FieldKind::File => Vec::new(),
        }
    }
}

/// Generates a field slug from its label.
pub fn generate_field_slug(label: &str) -> String {
    super::form::slugify(label, '_')
}

// ============================================================================
// Request / response DTOs
// ============================================================================

/// Request payload for adding a field to a form.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
#[validate(schema(function = "validate_create_choices"))]
pub struct CreateFieldRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Label must be between 1 and 200 characters"
    ))]
    pub label: String,

    #[validate(
        length(max = 100, message = "Slug must be at most 100 characters"),
        custom(function = "shared::validation::validate_slug")
    )]
    pub slug: Option<String>,

    pub field_type: FieldType,

    /// Appended after the last field when absent.
    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: Option<i32>,

    pub required: Option<bool>,
    pub visible: Option<bool>,

    #[serde(default)]
    pub choices: String,

    #[serde(default)]
    pub default_value: String,

    #[validate(length(max = 100, message = "Placeholder must be at most 100 characters"))]
    pub placeholder_text: Option<String>,

    #[serde(default)]
    #[validate(length(max = 100, message = "Help text must be at most 100 characters"))]
    pub help_text: String,
}

fn validate_create_choices(request: &CreateFieldRequest) -> Result<(), ValidationError> {
    validate_choices_present(request.field_type, &request.choices)
}

fn validate_choices_present(field_type: FieldType, choices: &str) -> Result<(), ValidationError> {
    if field_type.has_choices() && choices.trim().is_empty() {
        let mut err = ValidationError::new("choices_required");
        err.message = Some(format!("Choices are required for {} fields", field_type).into());
        return Err(err);
    }
    Ok(())
}

/// Request payload for updating a field.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateFieldRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Label must be between 1 and 200 characters"
    ))]
    pub label: Option<String>,

    #[validate(
        length(max = 100, message = "Slug must be at most 100 characters"),
        custom(function = "shared::validation::validate_slug")
    )]
    pub slug: Option<String>,

    pub field_type: Option<FieldType>,

    /// Moves the field, shifting the fields in between.
    #[validate(range(min = 0, message = "Order must not be negative"))]
    pub order: Option<i32>,

    pub required: Option<bool>,
    pub visible: Option<bool>,
    pub choices: Option<String>,
    pub default_value: Option<String>,

    #[validate(length(max = 100, message = "Placeholder must be at most 100 characters"))]
    pub placeholder_text: Option<String>,

    #[validate(length(max = 100, message = "Help text must be at most 100 characters"))]
    pub help_text: Option<String>,
}

impl UpdateFieldRequest {
    /// Applies the changes to a copy of `field`. `order` is handled by the
    /// repository since moving a field shifts its neighbours.
    pub fn apply(&self, field: &Field) -> Result<Field, ValidationError> {
        let mut updated = field.clone();
        if let Some(label) = &self.label {
            updated.label = label.clone();
        }
        if let Some(slug) = &self.slug {
            updated.slug = slug.clone();
        }
        if let Some(field_type) = self.field_type {
            updated.field_type = field_type;
        }
        if let Some(required) = self.required {
            updated.required = required;
        }
        if let Some(visible) = self.visible {
            updated.visible = visible;
        }
        if let Some(choices) = &self.choices {
            updated.choices = choices.clone();
        }
        if let Some(default_value) = &self.default_value {
            updated.default_value = default_value.clone();
        }
        if let Some(placeholder_text) = &self.placeholder_text {
            updated.placeholder_text = Some(placeholder_text.clone());
        }
        if let Some(help_text) = &self.help_text {
            updated.help_text = help_text.clone();
        }

        validate_choices_present(updated.field_type, &updated.choices)?;
        Ok(updated)
    }
}

/// Configured maximum lengths for field definitions and values.
#[derive(Debug, Clone, Copy)]
pub struct FieldLimits {
    pub label_max_length: usize,
    pub choices_max_length: usize,
    pub field_max_length: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            label_max_length: 200,
            choices_max_length: 1000,
            field_max_length: 2000,
        }
    }
}

impl FieldLimits {
    /// Checks a field definition against the configured limits.
    ///
    /// Returns `(attribute, message)` pairs for every violation.
    pub fn check(&self, field: &Field) -> Vec<(&'static str, String)> {
        let mut violations = Vec::new();
        if field.label.chars().count() > self.label_max_length {
            violations.push((
                "label",
                format!("Label must be at most {} characters", self.label_max_length),
            ));
        }
        if field.choices.chars().count() > self.choices_max_length {
            violations.push((
                "choices",
                format!(
                    "Choices must be at most {} characters",
                    self.choices_max_length
                ),
            ));
        }
        if field.default_value.chars().count() > self.field_max_length {
            violations.push((
                "default_value",
                format!(
                    "Default value must be at most {} characters",
                    self.field_max_length
                ),
            ));
        }
        violations
    }
}

/// Field as rendered in the public form detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FieldDetail {
    pub id: Uuid,
    pub slug: String,
    pub label: String,
    pub field_type: FieldType,
    pub order: i32,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub default_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder_text: Option<String>,
    pub help_text: String,
}

impl FieldDetail {
    pub fn from_field(field: &Field, syntax: &ChoiceSyntax) -> Self {
        Self {
            id: field.id,
            slug: field.slug.clone(),
            label: field.label.clone(),
            field_type: field.field_type,
            order: field.order,
            required: field.required,
            options: field.options(syntax),
            default_value: field.default_value.clone(),
            placeholder_text: field.placeholder_text.clone(),
            help_text: field.help_text.clone(),
        }
    }
}

/// Response for listing a form's fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListFieldsResponse {
    pub data: Vec<Field>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_field;

    #[test]
    fn test_parse_choices_with_quoted_delimiter() {
        let options = parse_choices(r#"a,"b,c",d"#, &ChoiceSyntax::default());
        assert_eq!(options, vec!["a", "b,c", "d"]);
    }

    #[test]
    fn test_parse_choices_trims_and_skips_empty() {
        let options = parse_choices(" Red , ,Green,, Blue ,", &ChoiceSyntax::default());
        assert_eq!(options, vec!["Red", "Green", "Blue"]);
        assert!(parse_choices("", &ChoiceSyntax::default()).is_empty());
        assert!(parse_choices(" , ", &ChoiceSyntax::default()).is_empty());
    }

    #[test]
    fn test_parse_choices_custom_quotes() {
        let syntax = ChoiceSyntax {
            quote: '`',
            unquote: '\'',
        };
        let options = parse_choices("one,`two, three',\"four\"", &syntax);
        assert_eq!(options, vec!["one", "two, three", "\"four\""]);
    }

    #[test]
    fn test_parse_choices_unterminated_quote_runs_to_end() {
        let options = parse_choices(r#"a,"b,c"#, &ChoiceSyntax::default());
        assert_eq!(options, vec!["a", "b,c"]);
    }

    #[test]
    fn test_split_selections() {
        let options = parse_choices("A,B,C", &ChoiceSyntax::default());
        assert_eq!(split_selections("A, B,,C ", &options), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_split_selections_keeps_quoted_option_whole() {
        let options = parse_choices(r#"a,"b,c",d"#, &ChoiceSyntax::default());
        assert_eq!(split_selections("b,c, a", &options), vec!["b,c", "a"]);
        assert_eq!(split_selections("a, b,c, d", &options), vec!["a", "b,c", "d"]);
    }

    #[test]
    fn test_split_selections_unknown_text_runs_to_delimiter() {
        let options = parse_choices("Red,Blue", &ChoiceSyntax::default());
        assert_eq!(
            split_selections("Red, Green, Blue", &options),
            vec!["Red", "Green", "Blue"]
        );
        assert!(split_selections(" , ", &options).is_empty());
    }

    #[test]
    fn test_field_type_kind() {
        assert_eq!(FieldType::Text.kind(), FieldKind::FreeText);
        assert_eq!(FieldType::DateOfBirth.kind(), FieldKind::FreeText);
        assert_eq!(FieldType::RadioMultiple.kind(), FieldKind::Choice);
        assert_eq!(FieldType::Select.kind(), FieldKind::Choice);
        assert_eq!(FieldType::SelectMultiple.kind(), FieldKind::MultipleChoice);
        assert_eq!(FieldType::CheckboxMultiple.kind(), FieldKind::MultipleChoice);
        assert_eq!(FieldType::Checkbox.kind(), FieldKind::Boolean);
        assert_eq!(FieldType::File.kind(), FieldKind::File);
    }

    #[test]
    fn test_field_type_round_trip() {
        for field_type in [
            FieldType::Text,
            FieldType::CheckboxMultiple,
            FieldType::DateTime,
            FieldType::Url,
        ] {
            assert_eq!(field_type.as_str().parse::<FieldType>().unwrap(), field_type);
            let json = serde_json::to_string(&field_type).unwrap();
            assert_eq!(json, format!("\"{}\"", field_type.as_str()));
        }
        assert!("slider".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_checkbox_options() {
        let field = sample_field("Agree", FieldType::Checkbox, 0, "");
        assert_eq!(
            field.options(&ChoiceSyntax::default()),
            vec![CHECKBOX_TRUE, CHECKBOX_FALSE]
        );
    }

    #[test]
    fn test_text_field_has_no_options() {
        let field = sample_field("Name", FieldType::Text, 0, "ignored,values");
        assert!(field.options(&ChoiceSyntax::default()).is_empty());
    }

    #[test]
    fn test_generate_field_slug() {
        assert_eq!(generate_field_slug("First Name"), "first_name");
        assert_eq!(generate_field_slug("E-mail address?"), "e_mail_address");
    }

    #[test]
    fn test_create_field_request_requires_choices() {
        let request: CreateFieldRequest = serde_json::from_value(serde_json::json!({
            "label": "Colour",
            "field_type": "select"
        }))
        .unwrap();
        assert!(request.validate().is_err());

        let request: CreateFieldRequest = serde_json::from_value(serde_json::json!({
            "label": "Colour",
            "field_type": "select",
            "choices": "Red, Green"
        }))
        .unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_field_request_rejects_negative_order() {
        let request: CreateFieldRequest = serde_json::from_value(serde_json::json!({
            "label": "Name",
            "field_type": "text",
            "order": -1
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_field_request_apply() {
        let field = sample_field("Colour", FieldType::Select, 1, "Red, Green");
        let request: UpdateFieldRequest = serde_json::from_value(serde_json::json!({
            "label": "Favourite colour",
            "required": false
        }))
        .unwrap();

        let updated = request.apply(&field).unwrap();
        assert_eq!(updated.label, "Favourite colour");
        assert!(!updated.required);
        assert_eq!(updated.slug, field.slug);
        assert_eq!(updated.order, 1);
    }

    #[test]
    fn test_update_field_request_rejects_clearing_choices() {
        let field = sample_field("Colour", FieldType::Select, 0, "Red, Green");
        let request: UpdateFieldRequest =
            serde_json::from_value(serde_json::json!({ "choices": "" })).unwrap();
        assert!(request.apply(&field).is_err());
    }

    #[test]
    fn test_field_limits() {
        let limits = FieldLimits {
            label_max_length: 5,
            choices_max_length: 3,
            field_max_length: 10,
        };
        let field = sample_field("Colour", FieldType::Select, 0, "Red, Green");
        let violations = limits.check(&field);
        let attributes: Vec<_> = violations.iter().map(|(attr, _)| *attr).collect();
        assert_eq!(attributes, vec!["label", "choices"]);

        assert!(FieldLimits::default().check(&field).is_empty());
    }

    #[test]
    fn test_field_detail_serialization() {
        let field = sample_field("Colour", FieldType::RadioMultiple, 0, "Red, Green");
        let detail = FieldDetail::from_field(&field, &ChoiceSyntax::default());
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["field_type"], "radio_multiple");
        assert_eq!(json["options"], serde_json::json!(["Red", "Green"]));
        assert!(json.get("placeholder_text").is_none());
    }
}
