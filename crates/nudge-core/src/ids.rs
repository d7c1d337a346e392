//! Branded ID newtypes for type safety.
//!
//! Every opaque token in Nudge has a distinct ID type implemented as a
//! newtype wrapper around `String`. This prevents accidentally passing a
//! verification handle where a reminder ID is expected.
//!
//! Locally minted IDs are time-ordered UUID v7 strings. IDs handed out by a
//! provider or store are wrapped verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mint a fresh locally generated ID.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// The raw token.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }
    };
}

branded_id! {
    /// Identifier of an authenticated principal. Scopes all reminder visibility.
    IdentityId
}

branded_id! {
    /// Store-assigned identifier of a reminder record.
    ReminderId
}

branded_id! {
    /// Opaque token linking an OTP request to its confirmation call.
    VerificationHandle
}

branded_id! {
    /// Opaque handle of a human-verification challenge instance.
    ChallengeId
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
