//! Sign-in and phone verification settings.

use serde::{Deserialize, Serialize};

/// Presentation size of the human-verification challenge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeSize {
    /// Resolved without user interaction where the provider allows it.
    #[default]
    Invisible,
    /// Rendered as an interactive widget.
    Normal,
}

/// Sign-in and phone verification settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Challenge presentation size.
    pub challenge_size: ChallengeSize,
    /// Code accepted by the in-process development identity provider.
    pub dev_otp_code: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            challenge_size: ChallengeSize::Invisible,
            dev_otp_code: "123456".to_string(),
        }
    }
}
