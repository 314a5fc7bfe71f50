use serde::{Deserialize, Serialize};

use crate::ids::ConversationId;

/// Who spoke a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One role-tagged message in a conversation. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The full persisted turn history for one conversation id.
///
/// Turns are append-only from the orchestrator's perspective; only an explicit
/// `clear` removes them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: ConversationId,
    pub turns: Vec<Turn>,
}

impl Session {
    /// A fresh session carrying exactly the tenant's seed system turn.
    pub fn seeded(id: ConversationId, greeting: impl Into<String>) -> Self {
        Self {
            id,
            turns: vec![Turn::system(greeting)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::assistant(content));
    }

    /// The trailing window of the most recent `k` turns.
    pub fn recent(&self, k: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(k);
        &self.turns[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            r#""assistant""#
        );
    }

    #[test]
    fn role_display_from_str_roundtrip() {
        for role in [Role::System, Role::User, Role::Assistant] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(role, parsed);
        }
        assert!("robot".parse::<Role>().is_err());
    }

    #[test]
    fn seeded_session_has_one_system_turn() {
        let session = Session::seeded(
            ConversationId::from_raw("5491112345678"),
            "¡Hola! ¿En qué te puedo ayudar?",
        );
        assert_eq!(session.turns.len(), 1);
        assert_eq!(session.turns[0].role, Role::System);
    }

    #[test]
    fn turns_append_in_order() {
        let mut session = Session::seeded(ConversationId::web_user(), "hola");
        session.push_user("quiero cinta de embalar");
        session.push_assistant("te cuento las opciones");
        let roles: Vec<Role> = session.turns.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
    }

    #[test]
    fn recent_returns_trailing_window() {
        let mut session = Session::seeded(ConversationId::web_user(), "seed");
        for i in 0..10 {
            session.push_user(format!("msg {i}"));
        }
        let window = session.recent(5);
        assert_eq!(window.len(), 5);
        assert_eq!(window[4].content, "msg 9");
        assert_eq!(window[0].content, "msg 5");
    }

    #[test]
    fn recent_window_larger_than_history() {
        let session = Session::seeded(ConversationId::web_user(), "seed");
        assert_eq!(session.recent(5).len(), 1);
    }
}
