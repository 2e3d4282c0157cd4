//! Template placeholder substitution and price formatting.
//!
//! Templates use `{name}` placeholders. Literal braces are written `{{` and
//! `}}`. Substitution is explicit: every placeholder must have a value in the
//! supplied map, otherwise rendering fails with a [`RenderError`] and the
//! caller decides how to recover.

use std::collections::HashMap;

use thiserror::Error;

/// Name of the single placeholder the catalog allows.
pub const PRICE_PLACEHOLDER: &str = "price";

/// Currency symbol prefixed to formatted prices.
pub const CURRENCY_SYMBOL: &str = "$";

/// Errors raised while parsing or rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// A `{` was never closed.
    #[error("unclosed placeholder starting at byte {offset}")]
    Unclosed {
        /// Byte offset of the opening brace.
        offset: usize,
    },
    /// A single `}` appeared outside a placeholder.
    #[error("unmatched '}}' at byte {offset}")]
    UnmatchedClose {
        /// Byte offset of the stray brace.
        offset: usize,
    },
    /// Placeholder name is empty or not an identifier.
    #[error("invalid placeholder name {name:?}")]
    InvalidPlaceholder {
        /// The offending name.
        name: String,
    },
    /// No value was supplied for a placeholder.
    #[error("no value supplied for placeholder '{name}'")]
    MissingValue {
        /// The placeholder name.
        name: String,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

fn parse(template: &str) -> Result<Vec<Segment>, RenderError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '{' => {
                if chars.next_if(|&(_, next)| next == '{').is_some() {
                    literal.push('{');
                    continue;
                }

                let mut name = String::new();
                let mut closed = false;
                for (_, nc) in chars.by_ref() {
                    if nc == '}' {
                        closed = true;
                        break;
                    }
                    name.push(nc);
                }
                if !closed {
                    return Err(RenderError::Unclosed { offset });
                }
                if !is_identifier(&name) {
                    return Err(RenderError::InvalidPlaceholder { name });
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name));
            }
            '}' => {
                if chars.next_if(|&(_, next)| next == '}').is_some() {
                    literal.push('}');
                    continue;
                }
                return Err(RenderError::UnmatchedClose { offset });
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// List the placeholder names of a template, in order of appearance.
///
/// # Errors
///
/// Returns [`RenderError`] if the template is malformed.
pub fn placeholders(template: &str) -> Result<Vec<String>, RenderError> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// Substitute every placeholder in `template` with its value from `vars`.
///
/// # Errors
///
/// Returns [`RenderError`] if the template is malformed or a placeholder has
/// no value in `vars`.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Placeholder(name) => match vars.get(name.as_str()) {
                Some(value) => out.push_str(value),
                None => return Err(RenderError::MissingValue { name }),
            },
        }
    }
    Ok(out)
}

/// Format a price as currency with thousands separators and no decimals.
///
/// Rounds half to even. An absent price formats as the empty string.
///
/// ```
/// use llm_phraser::render::format_price;
///
/// assert_eq!(format_price(Some(48_000.0)), "$48,000");
/// assert_eq!(format_price(Some(1_234_567.5)), "$1,234,568");
/// assert_eq!(format_price(None), "");
/// ```
pub fn format_price(price: Option<f64>) -> String {
    let Some(value) = price else {
        return String::new();
    };

    let whole = format!("{value:.0}");
    let (sign, digits) = match whole.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", whole.as_str()),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return format!("{CURRENCY_SYMBOL}{whole}");
    }
    format!("{CURRENCY_SYMBOL}{sign}{}", group_thousands(digits))
}

fn group_thousands(digits: &str) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut groups: Vec<String> = chars
        .rchunks(3)
        .map(|chunk| chunk.iter().collect())
        .collect();
    groups.reverse();
    groups.join(",")
}
