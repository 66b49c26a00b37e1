//! System prompt composition.

use tracing::debug;

use crate::template::{PromptTemplate, TemplateResult};

/// Base prompt used when an agent is created without one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Instructions appended to the base prompt whenever tools are available.
///
/// The directive syntax shown here is exactly what the directive parser
/// accepts; changing it changes what the model emits.
pub const TOOL_USAGE_TEMPLATE: &str = "{{basic_prompt}}

## Available tools
You can use the following tools to help answer the question:
{{tool_descriptions}}

## Tool call format
When you need to call a tool, use exactly this format:
`[TOOL_CALL:{tool_name}:{parameters}]`

### Parameter format
1. **Multiple parameters**: use `key=value` pairs separated by commas
   Example: `[TOOL_CALL:calculator_multiply:a=12,b=8]`
   Example: `[TOOL_CALL:filesystem_read_file:path=README.md]`
2. **Single parameter**: use one `key=value` pair
   Example: `[TOOL_CALL:search:query=Rust programming]`

### Important
- Parameter names must match the tool definition exactly
- Write numbers without quotes: `a=12`, not `a=\"12\"`
- Write strings such as file paths directly: `path=README.md`
- Tool results are inserted into the conversation automatically; continue your answer based on them
";

/// The agent's base system prompt plus the tool-usage composition rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemPrompt {
    base: String,
}

impl SystemPrompt {
    /// Wraps the supplied base prompt.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Returns the base prompt.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Composes the prompt sent to the model.
    ///
    /// Without tool descriptions the base prompt is returned verbatim;
    /// otherwise it is followed by [`TOOL_USAGE_TEMPLATE`] with the
    /// descriptions embedded unchanged.
    ///
    /// # Errors
    ///
    /// Propagates template rendering failures, which only occur if the
    /// built-in template is edited into an invalid state.
    pub fn compose(&self, tool_descriptions: Option<&str>) -> TemplateResult<String> {
        let Some(descriptions) = tool_descriptions else {
            return Ok(self.base.clone());
        };

        debug!(
            description_bytes = descriptions.len(),
            "composing tool-usage system prompt"
        );
        PromptTemplate::new(TOOL_USAGE_TEMPLATE).render(&[
            ("basic_prompt", self.base.as_str()),
            ("tool_descriptions", descriptions),
        ])
    }
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_prompt_is_verbatim_without_tools() {
        let prompt = SystemPrompt::new("Be brief.");
        assert_eq!(prompt.compose(None).unwrap(), "Be brief.");
    }

    #[test]
    fn tool_prompt_embeds_descriptions_and_syntax() {
        let prompt = SystemPrompt::new("Be brief.");
        let composed = prompt
            .compose(Some("calculator_add: Adds two numbers"))
            .unwrap();

        assert!(composed.starts_with("Be brief.\n\n## Available tools"));
        assert!(composed.contains("calculator_add: Adds two numbers\n"));
        assert!(composed.contains("`[TOOL_CALL:{tool_name}:{parameters}]`"));
        assert!(composed.contains("[TOOL_CALL:calculator_multiply:a=12,b=8]"));
    }

    #[test]
    fn template_declares_both_variables() {
        let vars = PromptTemplate::new(TOOL_USAGE_TEMPLATE).variables().unwrap();
        assert_eq!(vars, ["basic_prompt", "tool_descriptions"]);
    }
}
