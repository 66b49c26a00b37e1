//! Extraction of `[TOOL_CALL:<name>:<params>]` directives from model output.

use std::sync::LazyLock;

use regex::Regex;

static DIRECTIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[TOOL_CALL:([^:\]]+):([^\]]+)\]").expect("directive pattern is valid")
});

/// One tool-call directive found in a model response.
///
/// Borrowed from the scanned text; the span is kept verbatim so the caller
/// can remove it from the response afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Directive<'t> {
    tool_name: &'t str,
    raw_parameters: &'t str,
    span: &'t str,
    start: usize,
}

impl<'t> Directive<'t> {
    /// Requested tool name with surrounding whitespace removed.
    #[must_use]
    pub fn tool_name(&self) -> &'t str {
        self.tool_name
    }

    /// Unparsed parameter blob with surrounding whitespace removed.
    #[must_use]
    pub fn raw_parameters(&self) -> &'t str {
        self.raw_parameters
    }

    /// The exact matched text, brackets included.
    #[must_use]
    pub fn span(&self) -> &'t str {
        self.span
    }

    /// Byte offset of the span in the scanned text.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Byte offset one past the end of the span.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.span.len()
    }
}

/// Lazy, left-to-right iterator over the directives in a text.
///
/// Cloning yields an independent iterator from the same position, and
/// [`parse_directives`] can always be called again; scanning has no side
/// effects.
#[derive(Clone, Debug)]
pub struct Directives<'t> {
    text: &'t str,
    cursor: usize,
}

impl<'t> Iterator for Directives<'t> {
    type Item = Directive<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.text.len() {
            return None;
        }
        let captures = DIRECTIVE_PATTERN.captures_at(self.text, self.cursor)?;
        let whole = captures.get(0)?;
        let name = captures.get(1)?;
        let parameters = captures.get(2)?;
        self.cursor = whole.end();

        Some(Directive {
            tool_name: name.as_str().trim(),
            raw_parameters: parameters.as_str().trim(),
            span: whole.as_str(),
            start: whole.start(),
        })
    }
}

/// Scans `text` for tool-call directives.
///
/// Malformed directives are simply not matched; scanning never fails.
///
/// # Examples
///
/// ```
/// use agent_tools::parse_directives;
///
/// let found: Vec<_> = parse_directives("[TOOL_CALL:calculator_add:a=2,b=3]").collect();
/// assert_eq!(found[0].tool_name(), "calculator_add");
/// assert_eq!(found[0].raw_parameters(), "a=2,b=3");
/// ```
#[must_use]
pub fn parse_directives(text: &str) -> Directives<'_> {
    Directives { text, cursor: 0 }
}

/// Returns `text` with the spans of `directives` removed.
///
/// The directives must have been parsed from the same `text`.
#[must_use]
pub fn strip_directives(text: &str, directives: &[Directive<'_>]) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut cursor = 0;
    for directive in directives {
        if directive.start() < cursor || directive.end() > text.len() {
            continue;
        }
        stripped.push_str(&text[cursor..directive.start()]);
        cursor = directive.end();
    }
    stripped.push_str(&text[cursor..]);
    stripped
}
