#[cfg(test)]
mod tests;

use crate::types::Subject;

/// The request context an operation is invoked with.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    session: Option<String>
}

impl Caller {
    pub fn with_session(session: impl Into<String>) -> Self {
        Self {
            session: Some(session.into())
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }
}

/// Resolves a caller to the subject the identity provider knows them by.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Returns `None` when the caller is not authenticated.
    fn resolve(&self, caller: &Caller) -> Option<Subject>;
}

/// Trusts the session token as the subject.
///
/// For deployments where an upstream layer has already verified the token and forwards the
/// subject it carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughIdentity;

impl IdentityProvider for PassthroughIdentity {
    fn resolve(&self, caller: &Caller) -> Option<Subject> {
        caller.session()
            .map(str::trim)
            .filter(|session| !session.is_empty())
            .map(Subject::from)
    }
}
