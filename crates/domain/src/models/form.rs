//! Form domain models: visibility policies, publishing and request payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::field::FieldDetail;

/// Visibility status attached to each of a form's three policies.
///
/// Stored as the integer codes 1-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Draft,
    Public,
    Private,
    Groups,
}

impl StatusLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLevel::Draft => "draft",
            StatusLevel::Public => "public",
            StatusLevel::Private => "private",
            StatusLevel::Groups => "groups",
        }
    }

    /// Integer code used in storage.
    pub fn code(&self) -> i16 {
        match self {
            StatusLevel::Draft => 1,
            StatusLevel::Public => 2,
            StatusLevel::Private => 3,
            StatusLevel::Groups => 4,
        }
    }

    /// Decodes a stored code. Unknown codes yield `None`.
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(StatusLevel::Draft),
            2 => Some(StatusLevel::Public),
            3 => Some(StatusLevel::Private),
            4 => Some(StatusLevel::Groups),
            _ => None,
        }
    }
}

impl FromStr for StatusLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(StatusLevel::Draft),
            "public" => Ok(StatusLevel::Public),
            "private" => Ok(StatusLevel::Private),
            "groups" => Ok(StatusLevel::Groups),
            _ => Err(format!("Invalid status level: {}", s)),
        }
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action a principal attempts on a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormAction {
    View,
    Submit,
    ViewResponses,
}

impl FormAction {
    pub const ALL: [FormAction; 3] = [
        FormAction::View,
        FormAction::Submit,
        FormAction::ViewResponses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormAction::View => "view",
            FormAction::Submit => "submit",
            FormAction::ViewResponses => "responses",
        }
    }
}

impl FromStr for FormAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(FormAction::View),
            "submit" => Ok(FormAction::Submit),
            "responses" => Ok(FormAction::ViewResponses),
            _ => Err(format!("Invalid form action: {}", s)),
        }
    }
}

impl fmt::Display for FormAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status level plus the groups it admits when the status is `Groups`.
///
/// `status` is `None` when the stored code is not a known level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityPolicy {
    pub status: Option<StatusLevel>,
    #[serde(default)]
    pub groups: HashSet<Uuid>,
}

impl VisibilityPolicy {
    pub fn new(status: StatusLevel) -> Self {
        Self {
            status: Some(status),
            groups: HashSet::new(),
        }
    }

    pub fn with_groups(status: StatusLevel, groups: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            status: Some(status),
            groups: groups.into_iter().collect(),
        }
    }
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self::new(StatusLevel::Public)
    }
}

/// Email settings for submission notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmailSettings {
    pub send_email: bool,
    pub email_from: String,
    pub email_copies: String,
    pub email_subject: String,
    pub email_message: String,
}

/// A user-built form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Form {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub intro: String,
    pub button_text: String,
    pub response: String,
    pub view_policy: VisibilityPolicy,
    pub submit_policy: VisibilityPolicy,
    pub responses_policy: VisibilityPolicy,
    pub publish_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub anonymous_vote: bool,
    pub email: EmailSettings,
    pub site_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inputs for deciding whether a form is published.
#[derive(Debug, Clone, Copy)]
pub struct PublishContext {
    pub now: DateTime<Utc>,
    /// Current site, set only when multi-site partitioning is enabled.
    pub site_id: Option<i32>,
}

impl PublishContext {
    pub fn new(now: DateTime<Utc>, site_id: Option<i32>) -> Self {
        Self { now, site_id }
    }
}

impl Form {
    /// Returns the policy governing the given action.
    pub fn policy(&self, action: FormAction) -> &VisibilityPolicy {
        match action {
            FormAction::View => &self.view_policy,
            FormAction::Submit => &self.submit_policy,
            FormAction::ViewResponses => &self.responses_policy,
        }
    }

    /// Returns true if the form appears in the public listing.
    ///
    /// Excluded when the view status is Draft, the publish date is in the
    /// future, the expiry date has passed, or the form is not attached to
    /// the current site.
    pub fn is_published(&self, ctx: &PublishContext) -> bool {
        if self.view_policy.status == Some(StatusLevel::Draft) {
            return false;
        }
        if matches!(self.publish_date, Some(publish) if publish > ctx.now) {
            return false;
        }
        if matches!(self.expiry_date, Some(expiry) if expiry < ctx.now) {
            return false;
        }
        match ctx.site_id {
            Some(site_id) => self.site_ids.contains(&site_id),
            None => true,
        }
    }
}

// ============================================================================
// Request / response DTOs
// ============================================================================

/// Policy as sent by clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyInput {
    pub status: StatusLevel,
    #[serde(default)]
    pub groups: Vec<Uuid>,
}

impl From<PolicyInput> for VisibilityPolicy {
    fn from(input: PolicyInput) -> Self {
        VisibilityPolicy::with_groups(input.status, input.groups)
    }
}

/// Request payload for creating a form.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
#[validate(schema(function = "validate_create_window"))]
pub struct CreateFormRequest {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Title must be between 1 and 50 characters"
    ))]
    pub title: String,

    #[validate(
        length(max = 100, message = "Slug must be at most 100 characters"),
        custom(function = "shared::validation::validate_slug")
    )]
    pub slug: Option<String>,

    #[serde(default)]
    pub intro: String,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Button text must be between 1 and 50 characters"
    ))]
    pub button_text: Option<String>,

    #[serde(default)]
    pub response: String,

    pub view: Option<PolicyInput>,
    pub submit: Option<PolicyInput>,
    pub responses: Option<PolicyInput>,

    pub publish_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,

    pub anonymous_vote: Option<bool>,

    pub send_email: Option<bool>,

    #[validate(email(message = "From address must be a valid email"))]
    pub email_from: Option<String>,

    #[validate(
        length(max = 200, message = "Copies must be at most 200 characters"),
        custom(function = "shared::validation::validate_email_list")
    )]
    pub email_copies: Option<String>,

    #[validate(length(max = 200, message = "Subject must be at most 200 characters"))]
    pub email_subject: Option<String>,

    pub email_message: Option<String>,

    pub site_ids: Option<Vec<i32>>,
}

fn validate_create_window(request: &CreateFormRequest) -> Result<(), ValidationError> {
    shared::validation::validate_publish_window(request.publish_date, request.expiry_date)
}

/// Request payload for updating a form. The slug cannot be changed.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateFormRequest {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Title must be between 1 and 50 characters"
    ))]
    pub title: Option<String>,

    pub intro: Option<String>,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Button text must be between 1 and 50 characters"
    ))]
    pub button_text: Option<String>,

    pub response: Option<String>,

    pub view: Option<PolicyInput>,
    pub submit: Option<PolicyInput>,
    pub responses: Option<PolicyInput>,

    /// `Some(None)` clears the date.
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub publish_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option::deserialize")]
    pub expiry_date: Option<Option<DateTime<Utc>>>,

    pub anonymous_vote: Option<bool>,

    pub send_email: Option<bool>,

    #[validate(email(message = "From address must be a valid email"))]
    pub email_from: Option<String>,

    #[validate(
        length(max = 200, message = "Copies must be at most 200 characters"),
        custom(function = "shared::validation::validate_email_list")
    )]
    pub email_copies: Option<String>,

    #[validate(length(max = 200, message = "Subject must be at most 200 characters"))]
    pub email_subject: Option<String>,

    pub email_message: Option<String>,

    pub site_ids: Option<Vec<i32>>,
}

impl UpdateFormRequest {
    /// Applies the changes to a copy of `form`.
    pub fn apply(self, form: &Form) -> Form {
        let mut updated = form.clone();
        if let Some(title) = self.title {
            updated.title = title;
        }
        if let Some(intro) = self.intro {
            updated.intro = intro;
        }
        if let Some(button_text) = self.button_text {
            updated.button_text = button_text;
        }
        if let Some(response) = self.response {
            updated.response = response;
        }
        if let Some(view) = self.view {
            updated.view_policy = view.into();
        }
        if let Some(submit) = self.submit {
            updated.submit_policy = submit.into();
        }
        if let Some(responses) = self.responses {
            updated.responses_policy = responses.into();
        }
        if let Some(publish_date) = self.publish_date {
            updated.publish_date = publish_date;
        }
        if let Some(expiry_date) = self.expiry_date {
            updated.expiry_date = expiry_date;
        }
        if let Some(anonymous_vote) = self.anonymous_vote {
            updated.anonymous_vote = anonymous_vote;
        }
        if let Some(send_email) = self.send_email {
            updated.email.send_email = send_email;
        }
        if let Some(email_from) = self.email_from {
            updated.email.email_from = email_from;
        }
        if let Some(email_copies) = self.email_copies {
            updated.email.email_copies = email_copies;
        }
        if let Some(email_subject) = self.email_subject {
            updated.email.email_subject = email_subject;
        }
        if let Some(email_message) = self.email_message {
            updated.email.email_message = email_message;
        }
        if let Some(site_ids) = self.site_ids {
            updated.site_ids = site_ids;
        }
        updated
    }
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Form entry in the public listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FormSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub intro: String,
    pub publish_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl From<&Form> for FormSummary {
    fn from(form: &Form) -> Self {
        Self {
            id: form.id,
            slug: form.slug.clone(),
            title: form.title.clone(),
            intro: form.intro.clone(),
            publish_date: form.publish_date,
            expiry_date: form.expiry_date,
        }
    }
}

/// Response for listing published forms.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListFormsResponse {
    pub data: Vec<FormSummary>,
    pub count: usize,
}

/// Public form detail with the fields to render.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FormDetail {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub intro: String,
    pub button_text: String,
    pub fields: Vec<FieldDetail>,
    pub can_submit: bool,
    pub can_view_responses: bool,
    pub login_required_to_submit: bool,
}

/// Staff view of a form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AdminFormResponse {
    #[serde(flatten)]
    pub form: Form,
    pub total_entries: i64,
}

/// Response for the staff listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListAdminFormsResponse {
    pub data: Vec<AdminFormResponse>,
    pub count: usize,
}

/// Generates a URL-safe slug from a title.
pub fn generate_slug(title: &str) -> String {
    slugify(title, '-')
}

/// Lowercases, drops punctuation and joins words with `separator`.
pub fn slugify(text: &str, separator: char) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                ' '
            }
        })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(&separator.to_string())
}
