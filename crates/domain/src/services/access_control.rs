//! Access control evaluation for forms.
//!
//! Every form carries three independent policies (view, submit, view
//! responses). Each policy is evaluated with the same precedence:
//! 1. Staff are always permitted
//! 2. Public admits anyone
//! 3. Private admits any authenticated principal
//! 4. Groups admits principals sharing at least one group with the policy
//! 5. Draft and unknown statuses deny everyone else

use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use crate::models::form::{Form, FormAction, PublishContext, StatusLevel};
use crate::models::principal::Principal;

/// Why a form action was refused.
///
/// Both variants are reported to clients as not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Form is not published")]
    NotPublished,

    #[error("Action not permitted")]
    Denied,
}

/// Decides whether `principal` satisfies a single policy.
pub fn is_permitted(
    principal: &Principal,
    status: Option<StatusLevel>,
    allowed_groups: &HashSet<Uuid>,
) -> bool {
    if principal.is_staff {
        return true;
    }
    match status {
        Some(StatusLevel::Public) => true,
        Some(StatusLevel::Private) => principal.is_authenticated(),
        Some(StatusLevel::Groups) => {
            !allowed_groups.is_empty() && !allowed_groups.is_disjoint(&principal.groups)
        }
        Some(StatusLevel::Draft) | None => false,
    }
}

/// Evaluates the policy the form attaches to `action`.
pub fn can_perform(form: &Form, principal: &Principal, action: FormAction) -> bool {
    let policy = form.policy(action);
    is_permitted(principal, policy.status, &policy.groups)
}

/// Checks that the form is visible to the principal and the action allowed.
///
/// Staff bypass the published filter.
pub fn authorize(
    form: &Form,
    principal: &Principal,
    action: FormAction,
    ctx: &PublishContext,
) -> Result<(), AccessError> {
    if !principal.is_staff && !form.is_published(ctx) {
        return Err(AccessError::NotPublished);
    }
    if !can_perform(form, principal, action) {
        return Err(AccessError::Denied);
    }
    Ok(())
}
