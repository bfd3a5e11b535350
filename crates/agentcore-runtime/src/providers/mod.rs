pub mod bedrock;
pub mod openai;

use agentcore_core::messaging::{AgentMessage, MessageRole};

pub use bedrock::{BedrockConfig, BedrockConverseModel};
pub use openai::{OpenAiChatModel, OpenAiConfig};

/// Chat role and text for providers without native tool messages. Tool
/// results go back to the model as user turns naming the tool.
pub(crate) fn chat_turn(message: &AgentMessage) -> (&'static str, String) {
    let text = message.text_content();
    match message.role {
        MessageRole::User => ("user", text),
        MessageRole::Agent => ("assistant", text),
        MessageRole::System => ("system", text),
        MessageRole::Tool => {
            let name = message
                .metadata
                .as_ref()
                .and_then(|m| m.tool_name.as_deref())
                .unwrap_or("tool");
            ("user", format!("Result of tool `{name}`:\n{text}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_core::session::SessionKey;
    use agentcore_core::tools::{ToolContext, ToolResult};

    #[test]
    fn tool_results_become_user_turns() {
        let ctx = ToolContext::new(SessionKey::new("a", "s"));
        let message = ToolResult::text("4").into_message("add", &ctx);
        assert_eq!(chat_turn(&message), ("user", "Result of tool `add`:\n4".to_string()));
        assert_eq!(chat_turn(&AgentMessage::agent("hi")).0, "assistant");
    }
}
