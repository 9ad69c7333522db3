//! Fixtures shared by unit tests.

use chrono::Utc;
use uuid::Uuid;

use crate::models::field::{generate_field_slug, Field, FieldType};
use crate::models::form::{EmailSettings, Form, VisibilityPolicy};

/// A public, anonymous, always-published form on site 1.
pub fn sample_form() -> Form {
    let now = Utc::now();
    Form {
        id: Uuid::new_v4(),
        title: "Contact Us".to_string(),
        slug: "contact-us".to_string(),
        intro: "Get in touch".to_string(),
        button_text: "Submit".to_string(),
        response: "Thanks!".to_string(),
        view_policy: VisibilityPolicy::default(),
        submit_policy: VisibilityPolicy::default(),
        responses_policy: VisibilityPolicy::default(),
        publish_date: None,
        expiry_date: None,
        anonymous_vote: true,
        email: EmailSettings::default(),
        site_ids: vec![1],
        created_at: now,
        updated_at: now,
    }
}

/// A required, visible field with the given type and choices.
pub fn sample_field(label: &str, field_type: FieldType, order: i32, choices: &str) -> Field {
    let now = Utc::now();
    Field {
        id: Uuid::new_v4(),
        form_id: Uuid::nil(),
        label: label.to_string(),
        slug: generate_field_slug(label),
        field_type,
        order,
        required: true,
        visible: true,
        choices: choices.to_string(),
        default_value: String::new(),
        placeholder_text: None,
        help_text: String::new(),
        created_at: now,
        updated_at: now,
    }
}
