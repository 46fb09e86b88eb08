//! A simple session-backed current user.

use std::collections::HashSet;

use modhub_core::traits::user::{ADMINISTER_SITE, CurrentUser};

/// The principal of the current request with an explicit permission set.
#[derive(Debug, Clone, Default)]
pub struct SessionUser {
    authenticated: bool,
    permissions: HashSet<String>,
}

impl SessionUser {
    /// No one is signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A signed-in user holding `permissions`.
    pub fn member<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authenticated: true,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    /// A signed-in administrator.
    pub fn admin() -> Self {
        Self::member([ADMINISTER_SITE])
    }
}

impl CurrentUser for SessionUser {
    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.authenticated && self.permissions.contains(permission)
    }
}
