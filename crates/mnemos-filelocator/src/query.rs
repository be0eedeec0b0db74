//! Query normalisation (spec.md §4.C4): "normalises tokens (supports list
//! or string input), fixes known quoting edge cases (trailing `\"`)".

/// A locator query accepts either a single free-text string or a list of
/// already-split tokens — both are normalised to the same `Vec<String>`
/// shape before being handed to the backend.
#[derive(Debug, Clone)]
pub enum QueryInput {
    Text(String),
    Tokens(Vec<String>),
}

impl From<&str> for QueryInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for QueryInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for QueryInput {
    fn from(value: Vec<String>) -> Self {
        Self::Tokens(value)
    }
}

/// A structured filter clause recognised inside a query
/// (spec.md §4.C4: "plus `path:"…"`, `content:"…"`, and extension
/// filters").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub free_tokens: Vec<String>,
    pub path_filter: Option<String>,
    pub content_filter: Option<String>,
    pub ext_filter: Option<String>,
}

impl QueryInput {
    fn raw_tokens(self) -> Vec<String> {
        match self {
            QueryInput::Text(text) => split_respecting_quotes(&text),
            QueryInput::Tokens(tokens) => tokens,
        }
    }

    /// Normalises raw tokens and splits out `path:"…"`/`content:"…"`/
    /// extension clauses from plain free-text tokens.
    #[must_use]
    pub fn parse(self) -> ParsedQuery {
        let mut parsed = ParsedQuery::default();
        for raw in self.raw_tokens() {
            let token = fix_trailing_quote(&raw);
            if token.is_empty() {
                continue;
            }
            if let Some(value) = token.strip_prefix("path:") {
                parsed.path_filter = Some(strip_quotes(value));
            } else if let Some(value) = token.strip_prefix("content:") {
                parsed.content_filter = Some(strip_quotes(value));
            } else if let Some(value) = token.strip_prefix("ext:") {
                parsed.ext_filter = Some(strip_quotes(value));
            } else {
                parsed.free_tokens.push(strip_quotes(&token));
            }
        }
        parsed
    }
}

/// Splits on whitespace but keeps `key:"quoted value"` clauses intact as
/// one token.
fn split_respecting_quotes(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// A known malformed edge case produced by upstream callers: a clause
/// like `content:"foo\"` where the closing quote got backslash-escaped
/// instead of terminating the string. Strips the dangling `\"` so the
/// clause still parses.
fn fix_trailing_quote(token: &str) -> String {
    if let Some(stripped) = token.strip_suffix("\\\"") {
        format!("{stripped}\"")
    } else {
        token.to_string()
    }
}

fn strip_quotes(value: &str) -> String {
    value.trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_query_splits_respecting_quoted_clauses() {
        let parsed = QueryInput::from("foo content:\"bar baz\" ext:rs").parse();
        assert_eq!(parsed.free_tokens, vec!["foo".to_string()]);
        assert_eq!(parsed.content_filter, Some("bar baz".to_string()));
        assert_eq!(parsed.ext_filter, Some("rs".to_string()));
    }

    #[test]
    fn token_list_input_is_parsed_the_same_way() {
        let parsed = QueryInput::from(vec!["foo".to_string(), "path:\"src\"".to_string()]).parse();
        assert_eq!(parsed.free_tokens, vec!["foo".to_string()]);
        assert_eq!(parsed.path_filter, Some("src".to_string()));
    }

    #[test]
    fn trailing_escaped_quote_is_repaired() {
        let parsed = QueryInput::from("content:\"unterminated\\\"").parse();
        assert_eq!(parsed.content_filter, Some("unterminated".to_string()));
    }
}
