//! System persona injected ahead of every chat conversation.

use skillspark_providers::{ChatMessage, ChatParams};

use crate::types::{ChatRequest, Language};

const PERSONA: &str = "You are SkillSpark's AI learning assistant. You help students and \
teachers understand lessons, explore AI tools, and practise new skills. Explain ideas \
clearly and step by step, use concrete examples, and keep answers friendly and concise. \
If you are not sure about something, say so instead of guessing.";

const ZH_TW_DIRECTIVE: &str = "Always reply in Traditional Chinese (繁體中文) as used in \
Taiwan, unless the user explicitly asks for another language.";

pub fn system_message(language: Language) -> ChatMessage {
    match language {
        Language::En => ChatMessage::system(PERSONA),
        Language::ZhTw => ChatMessage::system(format!("{PERSONA}\n\n{ZH_TW_DIRECTIVE}")),
    }
}

/// Upstream parameters for a chat request. The caller's messages follow the
/// persona untouched.
pub fn chat_params(request: ChatRequest) -> ChatParams {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    messages.push(system_message(request.language));
    messages.extend(request.messages);

    ChatParams {
        messages,
        model: request.model,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}
