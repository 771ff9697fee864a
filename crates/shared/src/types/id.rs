//! Typed IDs for type-safe entity references.
//!
//! Chat platforms hand out signed 64-bit identifiers for chats, users and
//! messages. Wrapping them prevents passing a `UserId` where a `GroupId` is
//! expected.

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers around `i64`.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Creates an ID from a raw value.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw value.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

typed_id!(GroupId, "Identifier of a chat group (one ledger per group).");
typed_id!(UserId, "Identifier of a chat user (operator or admin).");
typed_id!(
    TransactionId,
    "Sequence-unique identifier assigned to a transaction by the store."
);
typed_id!(
    MessageId,
    "Identifier of a chat message; used as the correlation id of a transaction."
);
