//! System prompt assembly: user instructions plus the tool catalogue and the
//! reply format the planner understands.

use agentcore_core::tools::ToolSchema;

/// Full system prompt for an agent. Without tools the instructions are
/// returned untouched.
pub fn build_system_prompt(instructions: &str, tools: &[ToolSchema]) -> String {
    if tools.is_empty() {
        return instructions.to_string();
    }

    let catalogue = tools
        .iter()
        .map(render_tool)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{instructions}

## Tools

You can call the following tools:

{catalogue}

To call tools, reply with only this JSON and nothing else:
{{"tool_calls": [{{"name": "<tool name>", "args": {{<arguments matching the tool's parameters>}}}}]}}

Tool results are sent back to you as messages. Once you have what you need,
answer the user in plain text. Never describe a tool call instead of making it."#
    )
}

fn render_tool(tool: &ToolSchema) -> String {
    let parameters = serde_json::to_string(&tool.parameters).unwrap_or_else(|_| "{}".to_string());
    format!(
        "- `{}`: {}\n  parameters: {}",
        tool.name,
        tool.description.trim(),
        parameters
    )
}
