use crate::reconciler::ReconcileError;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FailureKind {
    Unauthorized,
    NotFound,
    InvalidAmount,
    StoreFailure
}

/// Result shape handed back to the request layer. Operations never fail past this.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure {
        kind: FailureKind,
        message: String
    }
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn payload(&self) -> Option<&T> {
        match self {
            Outcome::Success(payload) => Some(payload),
            Outcome::Failure { .. } => None
        }
    }

    pub fn into_payload(self) -> Option<T> {
        match self {
            Outcome::Success(payload) => Some(payload),
            Outcome::Failure { .. } => None
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure { message, .. } => Some(message)
        }
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure { kind, .. } => Some(*kind)
        }
    }
}

impl<T> From<Result<T, ReconcileError>> for Outcome<T> {
    fn from(result: Result<T, ReconcileError>) -> Self {
        match result {
            Ok(payload) => Outcome::Success(payload),
            Err(error) => Outcome::Failure {
                kind: error.kind(),
                message: error.to_string()
            }
        }
    }
}
