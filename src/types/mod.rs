mod errors;
mod monetary;

use std::fmt;
use std::fmt::{Display, Formatter};

use serde::Deserialize;

pub use errors::MonetaryError;
pub use monetary::Money;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Stable identifier of a user record.
    UserId
);
opaque_id!(AccountId);
opaque_id!(TransactionId);
opaque_id!(
    /// The key the identity provider knows a user by. Distinct from [`UserId`].
    Subject
);
