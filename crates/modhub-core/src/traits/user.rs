//! Current-user trait.

/// Permission that grants administrative visibility.
pub const ADMINISTER_SITE: &str = "administer_site";

/// The authenticated principal (if any) of the current request.
pub trait CurrentUser: Send + Sync + std::fmt::Debug {
    /// Whether a user is signed in.
    fn is_authenticated(&self) -> bool;

    /// Whether the user holds the named permission.
    fn has_permission(&self, permission: &str) -> bool;

    /// Whether the user holds administrative privilege.
    fn is_admin(&self) -> bool {
        self.has_permission(ADMINISTER_SITE)
    }
}
