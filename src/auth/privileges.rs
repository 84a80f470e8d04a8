//! Elevated global privilege lookup.

use std::collections::HashSet;

use crate::models::to_id;

/// The identity invoking a registry operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Normalized user id
    pub id: String,
    /// Display name used in notices
    pub name: String,
    /// Holds elevated global privilege, bypassing clan rank checks
    pub elevated: bool,
}

impl Actor {
    pub fn new(name: &str, elevated: bool) -> Self {
        Self {
            id: to_id(name),
            name: name.trim().to_string(),
            elevated,
        }
    }
}

/// Users granted elevated privilege by the host.
#[derive(Debug, Clone, Default)]
pub struct Privileges {
    elevated: HashSet<String>,
}

impl Privileges {
    pub fn new<I, S>(users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            elevated: users
                .into_iter()
                .map(|u| to_id(u.as_ref()))
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    pub fn has_elevated_privilege(&self, user: &str) -> bool {
        self.elevated.contains(&to_id(user))
    }

    /// Resolve a user name into an [`Actor`].
    pub fn actor(&self, name: &str) -> Actor {
        Actor::new(name, self.has_elevated_privilege(name))
    }
}
