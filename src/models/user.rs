use crate::types::{Subject, UserId};

/// A user record. Created on first sign-in by the surrounding application.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct User {
    pub user_id: UserId,
    /// The identity provider's key for this user.
    pub subject: Subject
}

impl User {
    pub fn new(user_id: impl Into<UserId>, subject: impl Into<Subject>) -> Self {
        Self {
            user_id: user_id.into(),
            subject: subject.into()
        }
    }
}
