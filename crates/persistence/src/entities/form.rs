//! Form entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::form::{EmailSettings, Form, FormAction, StatusLevel, VisibilityPolicy};
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;

/// Database row mapping for the forms table.
#[derive(Debug, Clone, FromRow)]
pub struct FormEntity {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub intro: String,
    pub button_text: String,
    pub response: String,
    pub view_status: i16,
    pub submit_status: i16,
    pub responses_status: i16,
    pub publish_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub anonymous_vote: bool,
    pub send_email: bool,
    pub email_from: String,
    pub email_copies: String,
    pub email_subject: String,
    pub email_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the form_policy_groups table.
#[derive(Debug, Clone, FromRow)]
pub struct FormPolicyGroupEntity {
    pub form_id: Uuid,
    pub action: String,
    pub group_id: Uuid,
}

/// Row of the form_sites table.
#[derive(Debug, Clone, FromRow)]
pub struct FormSiteEntity {
    pub form_id: Uuid,
    pub site_id: i32,
}

/// Form row with its entry count, for the staff listing.
#[derive(Debug, Clone, FromRow)]
pub struct FormWithCountEntity {
    #[sqlx(flatten)]
    pub form: FormEntity,
    pub total_entries: i64,
}

impl FormEntity {
    /// Assembles the domain form from its row and related rows.
    pub fn into_domain(self, policy_groups: &[FormPolicyGroupEntity], site_ids: Vec<i32>) -> Form {
        let form_id = self.id;
        let groups_for = |action: FormAction| -> HashSet<Uuid> {
            policy_groups
                .iter()
                .filter(|g| g.form_id == form_id && g.action == action.as_str())
                .map(|g| g.group_id)
                .collect()
        };

        let view_policy = VisibilityPolicy {
            status: StatusLevel::from_code(self.view_status),
            groups: groups_for(FormAction::View),
        };
        let submit_policy = VisibilityPolicy {
            status: StatusLevel::from_code(self.submit_status),
            groups: groups_for(FormAction::Submit),
        };
        let responses_policy = VisibilityPolicy {
            status: StatusLevel::from_code(self.responses_status),
            groups: groups_for(FormAction::ViewResponses),
        };

        Form {
            id: self.id,
            title: self.title,
            slug: self.slug,
            intro: self.intro,
            button_text: self.button_text,
            response: self.response,
            view_policy,
            submit_policy,
            responses_policy,
            publish_date: self.publish_date,
            expiry_date: self.expiry_date,
            anonymous_vote: self.anonymous_vote,
            email: EmailSettings {
                send_email: self.send_email,
                email_from: self.email_from,
                email_copies: self.email_copies,
                email_subject: self.email_subject,
                email_message: self.email_message,
            },
            site_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Storage code of a policy status. Unknown statuses are never written.
pub fn status_code(policy: &VisibilityPolicy) -> i16 {
    policy.status.unwrap_or(StatusLevel::Draft).code()
}
