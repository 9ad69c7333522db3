//! The principal a request is evaluated for.

use std::collections::HashSet;
use uuid::Uuid;

/// Identity of the requester as seen by the access control evaluator.
///
/// Anonymous principals have no user id, are never staff and belong to no
/// groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Option<Uuid>,
    pub is_staff: bool,
    pub groups: HashSet<Uuid>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(
        user_id: Uuid,
        is_staff: bool,
        groups: impl IntoIterator<Item = Uuid>,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            is_staff,
            groups: groups.into_iter().collect(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}
