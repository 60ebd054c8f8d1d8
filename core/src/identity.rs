/// Owner used for every row when nobody is signed in.
pub const FALLBACK_OWNER_ID: &str = "demo-user-1";

/// Source of the signed-in user's id.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<String>;

    /// The id every row is scoped to: the signed-in user, or the fallback.
    fn owner_id(&self) -> String {
        self.current_user_id()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_OWNER_ID.to_string())
    }
}

/// Identity fixed at startup, e.g. from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user_id: Option<String>,
}

impl StaticIdentity {
    pub fn new(user_id: Option<String>) -> Self {
        Self { user_id }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}
