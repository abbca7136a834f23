//! Glob search patterns built from templates.

use crate::error::{Result, TemplateError};
use crate::template::{FormatTemplate, Segment};

/// A filesystem search pattern derived from a [`FormatTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPattern {
    /// Glob pattern: `?` per width character, `*` for width-less fields.
    pub pattern: String,
    /// Field names in template order.
    pub keys: Vec<String>,
    /// Declared width of each field.
    pub widths: Vec<Option<usize>>,
    /// Literal text before each field plus the trailing literal.
    pub fragments: Vec<String>,
}

impl SearchPattern {
    /// Pattern for fixed-width parsing. Every field must declare a width.
    pub fn fixed_width(template: &FormatTemplate) -> Result<Self> {
        Self::build(template, false)
    }

    /// Pattern for delimited parsing. Width-less fields match `*`.
    pub fn wildcard(template: &FormatTemplate) -> Result<Self> {
        Self::build(template, true)
    }

    fn build(template: &FormatTemplate, wildcard: bool) -> Result<Self> {
        let mut pattern = String::new();
        let mut keys = Vec::new();
        let mut widths = Vec::new();

        for segment in template.segments() {
            match segment {
                Segment::Literal(text) => push_literal(&mut pattern, text),
                Segment::Field(field) => {
                    match field.width() {
                        Some(width) => pattern.extend(std::iter::repeat('?').take(width)),
                        None if wildcard => pattern.push('*'),
                        None => {
                            return Err(TemplateError::UnknownWidth {
                                field: field.name().to_string(),
                            })
                        }
                    }
                    keys.push(field.name().to_string());
                    widths.push(field.width());
                }
            }
        }

        if keys.is_empty() {
            return Err(TemplateError::NoFields(template.to_string()));
        }

        Ok(Self {
            pattern,
            keys,
            widths,
            fragments: template.fragments(),
        })
    }

    /// Widths of every field, or `None` if any field is width-less.
    pub fn fixed_widths(&self) -> Option<Vec<usize>> {
        self.widths.iter().copied().collect()
    }
}

/// Append template literal text; `*` and `?` stay wildcards, brackets are escaped.
fn push_literal(pattern: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '[' => pattern.push_str("[[]"),
            ']' => pattern.push_str("[]]"),
            c => pattern.push(c),
        }
    }
}
