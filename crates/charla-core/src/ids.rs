use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Conversation id used for the anonymous web chat widget.
pub const WEB_USER: &str = "web_user";

/// Opaque external identifier for one end-user conversation.
///
/// For WhatsApp traffic this is the sender's wa_id (phone number with country
/// code); for web traffic it is either the shared `web_user` id or a generated
/// session token. Never reused across distinct end-users.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Generate a fresh web-session token.
    pub fn new_web() -> Self {
        Self(format!("web_{}", Uuid::now_v7()))
    }

    /// The shared id used by the web chat widget when no token is supplied.
    pub fn web_user() -> Self {
        Self(WEB_USER.to_owned())
    }

    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConversationId {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl AsRef<str> for ConversationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_token_has_prefix() {
        let id = ConversationId::new_web();
        assert!(id.as_str().starts_with("web_"), "got: {id}");
    }

    #[test]
    fn web_tokens_are_unique() {
        let a = ConversationId::new_web();
        let b = ConversationId::new_web();
        assert_ne!(a, b);
    }

    #[test]
    fn from_raw_preserves_value() {
        let id = ConversationId::from_raw("5491112345678");
        assert_eq!(id.as_str(), "5491112345678");
    }

    #[test]
    fn display_and_from_str_roundtrip() {
        let id = ConversationId::from_raw("5491112345678");
        let parsed: ConversationId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_roundtrip_is_transparent() {
        let id = ConversationId::from_raw("5491112345678");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""5491112345678""#);
        let parsed: ConversationId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
