//! Prompt templates with `{{variable}}` substitution.

use std::collections::HashMap;

/// Result alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while rendering a template.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A placeholder had no value.
    #[error("missing required variable: {name}")]
    MissingVariable {
        /// Name of the missing variable.
        name: String,
    },

    /// A `{{` was never closed.
    #[error("unterminated placeholder at byte {offset}")]
    Unterminated {
        /// Byte offset of the opening braces.
        offset: usize,
    },
}

/// A prompt template whose `{{name}}` placeholders are all required.
///
/// Rendering is a single left-to-right pass, so substituted values are
/// inserted verbatim even when they contain braces themselves. Single braces
/// (as in `{tool_name}`) are ordinary text.
///
/// # Examples
///
/// ```
/// use agent_prompts::PromptTemplate;
///
/// let template = PromptTemplate::new("You are {{role}}.");
/// let rendered = template.render(&[("role", "a helpful assistant")]).unwrap();
/// assert_eq!(rendered, "You are a helpful assistant.");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Creates a new template with the supplied text.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Returns the raw template string.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the placeholder names in order of first appearance.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unterminated`] for an unclosed placeholder.
    pub fn variables(&self) -> TemplateResult<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        for segment in segments(&self.template) {
            if let Segment::Placeholder(name) = segment? {
                if !names.iter().any(|known| known == name) {
                    names.push(name.to_owned());
                }
            }
        }
        Ok(names)
    }

    /// Renders the template with the supplied values.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] if a placeholder has no value
    /// and [`TemplateError::Unterminated`] for an unclosed placeholder.
    pub fn render(&self, values: &[(&str, &str)]) -> TemplateResult<String> {
        let lookup: HashMap<&str, &str> = values.iter().copied().collect();
        let mut rendered = String::with_capacity(self.template.len());

        for segment in segments(&self.template) {
            match segment? {
                Segment::Text(text) => rendered.push_str(text),
                Segment::Placeholder(name) => {
                    let value = lookup
                        .get(name)
                        .ok_or_else(|| TemplateError::MissingVariable {
                            name: name.to_owned(),
                        })?;
                    rendered.push_str(value);
                }
            }
        }

        Ok(rendered)
    }
}

enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn segments(template: &str) -> impl Iterator<Item = TemplateResult<Segment<'_>>> {
    let mut rest = template;
    let mut offset = 0;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(open) = rest.find("{{") else {
            let text = rest;
            rest = "";
            return Some(Ok(Segment::Text(text)));
        };
        if open > 0 {
            let text = &rest[..open];
            rest = &rest[open..];
            offset += open;
            return Some(Ok(Segment::Text(text)));
        }
        let Some(close) = rest[2..].find("}}") else {
            let start = offset;
            rest = "";
            return Some(Err(TemplateError::Unterminated { offset: start }));
        };
        let name = rest[2..2 + close].trim();
        let consumed = close + 4;
        rest = &rest[consumed..];
        offset += consumed;
        Some(Ok(Segment::Placeholder(name)))
    })
}
