use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> &ChatMessage {
        self.push(ChatMessage::new(Role::User, content))
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> &ChatMessage {
        self.push(ChatMessage::new(Role::Assistant, content))
    }

    /// Renders a failure as an assistant-style message so the transcript
    /// keeps flowing instead of the UI crashing.
    pub fn push_error(&mut self, detail: &str) -> &ChatMessage {
        let content = format!(
            "Sorry! 😔 Er ging iets mis.\n\nProbeer het nog een keer. Als het probleem blijft, \
             neem dan contact op met de beheerder.\n\n**Fout:** {}",
            detail
        );
        self.push(ChatMessage::new(Role::Assistant, content))
    }

    fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        self.messages.last().expect("message just pushed")
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_keep_insertion_order() {
        let mut conv = Conversation::new();
        conv.push_user("Wat is de Leermeter?");
        conv.push_assistant("De Leermeter is een hulpmiddel.");
        conv.push_user("Hoe werkt het?");

        let roles: Vec<Role> = conv.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    }

    #[test]
    fn message_ids_are_unique() {
        let mut conv = Conversation::new();
        conv.push_user("a");
        conv.push_user("a");
        assert_ne!(conv.messages()[0].id, conv.messages()[1].id);
    }

    #[test]
    fn reset_clears_history() {
        let mut conv = Conversation::new();
        conv.push_user("vraag");
        conv.reset();
        assert!(conv.messages().is_empty());
    }

    #[test]
    fn error_is_rendered_as_assistant_message() {
        let mut conv = Conversation::new();
        conv.push_error("netwerkfout");
        let msg = &conv.messages()[0];
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.contains("netwerkfout"));
    }
}
