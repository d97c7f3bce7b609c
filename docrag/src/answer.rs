//! Answer generation over retrieved context.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::Citation;
use crate::error::Result;

/// Who said a turn of the conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The person asking.
    User,
    /// The model.
    Assistant,
}

/// One earlier turn of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    /// Speaker.
    pub role: ChatRole,
    /// What was said.
    pub content: String,
}

impl ChatTurn {
    /// A user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    /// An assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// A chat-completion service that answers a prompt from supplied context.
///
/// Calls are stateless: everything the model needs comes in the arguments.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Answer `prompt` given the conversation so far and a context block.
    async fn generate(&self, prompt: &str, history: &[ChatTurn], context: &str) -> Result<String>;
}

/// Instructions sent ahead of the retrieved context.
pub const SYSTEM_PROMPT: &str = "You answer questions about the documentation excerpts below. \
Base the answer on the excerpts, mention the doc_id of the excerpts you rely on, and say so \
when the excerpts do not contain the answer.";

/// Combine the instructions and the context into one system message.
pub fn system_message(context: &str) -> String {
    if context.is_empty() {
        return format!("{SYSTEM_PROMPT}\n\n(no excerpts matched the question)");
    }
    format!("{SYSTEM_PROMPT}\n\n{context}")
}

/// A generated answer with the citations of the context it was given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagAnswer {
    /// The generated text.
    pub answer: String,
    /// Citations, most relevant first.
    pub citations: Vec<Citation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let turn = serde_json::to_value(ChatTurn::assistant("hi")).unwrap();
        assert_eq!(turn, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn system_message_embeds_context() {
        let message = system_message("[doc_id=1] source: a.txt\nbody");
        assert!(message.starts_with(SYSTEM_PROMPT));
        assert!(message.ends_with("[doc_id=1] source: a.txt\nbody"));
    }

    #[test]
    fn system_message_flags_empty_context() {
        assert!(system_message("").contains("no excerpts matched"));
    }
}
