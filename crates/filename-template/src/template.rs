//! Template parsing and rendering.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TemplateError};

/// Fields that contribute to a file's timestamp.
pub const DATE_FIELDS: [&str; 6] = ["year", "month", "day", "hour", "minute", "second"];

/// Fields used to pick the newest of several files sharing a timestamp.
pub const VERSION_FIELDS: [&str; 3] = ["version", "revision", "cycle"];

/// A named placeholder with its optional format spec (`year:04d`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: String,
    spec: Option<String>,
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> Option<&str> {
        self.spec.as_deref()
    }

    /// Declared width: the first non-zero integer in the spec.
    pub fn width(&self) -> Option<usize> {
        let spec = self.spec.as_deref()?;
        let start = spec.find(|c: char| c.is_ascii_digit())?;
        let digits: String = spec[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<usize>().ok().filter(|w| *w > 0)
    }

    fn is_zero_padded(&self) -> bool {
        self.spec.as_deref().is_some_and(|s| s.starts_with('0'))
    }

    fn type_char(&self) -> Option<char> {
        self.spec
            .as_deref()
            .and_then(|s| s.chars().last())
            .filter(|c| c.is_ascii_alphabetic())
    }
}

/// One piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Field(FieldSpec),
}

/// A value substituted into a template field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// A parsed filename template.
///
/// `{name}` and `{name:spec}` are fields, `{{` and `}}` are literal braces.
/// Formatting the template back with [`fmt::Display`] reproduces the
/// original string exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl FormatTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((pos, ch)) = chars.next() {
            match ch {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for (inner_pos, inner) in chars.by_ref() {
                        match inner {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => {
                                return Err(TemplateError::UnbalancedBrace {
                                    template: template.to_string(),
                                    position: inner_pos,
                                })
                            }
                            c => body.push(c),
                        }
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace {
                            template: template.to_string(),
                            position: pos,
                        });
                    }

                    let (name, spec) = match body.split_once(':') {
                        Some((name, spec)) => (name.trim(), Some(spec.to_string())),
                        None => (body.trim(), None),
                    };
                    if name.is_empty() {
                        return Err(TemplateError::EmptyFieldName {
                            template: template.to_string(),
                            position: pos,
                        });
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(FieldSpec {
                        name: name.to_string(),
                        spec,
                    }));
                }
                '}' => {
                    return Err(TemplateError::UnbalancedBrace {
                        template: template.to_string(),
                        position: pos,
                    })
                }
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(f) => Some(f),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields().any(|f| f.name == name)
    }

    /// Literal text before each field, followed by the trailing literal.
    ///
    /// Always one element longer than the number of fields.
    pub fn fragments(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => current.push_str(s),
                Segment::Field(_) => out.push(std::mem::take(&mut current)),
            }
        }
        out.push(current);
        out
    }

    /// Render the template, looking each field up in `values`.
    pub fn format(&self, values: &HashMap<&str, FieldValue>) -> Result<String> {
        self.format_with(|name| values.get(name).cloned())
    }

    /// Render the template with a lookup function.
    pub fn format_with<F>(&self, mut lookup: F) -> Result<String>
    where
        F: FnMut(&str) -> Option<FieldValue>,
    {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(field) => {
                    let value = lookup(&field.name)
                        .ok_or_else(|| TemplateError::MissingValue(field.name.clone()))?;
                    out.push_str(&render(field, &value)?);
                }
            }
        }
        Ok(out)
    }
}

fn render(field: &FieldSpec, value: &FieldValue) -> Result<String> {
    let width = field.width().unwrap_or(0);
    let invalid = || TemplateError::InvalidValue {
        field: field.name.clone(),
        value: value.to_string(),
        spec: field.spec.clone().unwrap_or_default(),
    };

    let as_int = |v: i64| {
        if field.is_zero_padded() {
            format!("{:0width$}", v, width = width)
        } else {
            format!("{:>width$}", v, width = width)
        }
    };

    match (value, field.type_char()) {
        (FieldValue::Int(v), None | Some('d')) => Ok(as_int(*v)),
        (FieldValue::Text(s), Some('d')) => s.trim().parse::<i64>().map(as_int).map_err(|_| invalid()),
        (v, None | Some('s') | Some('c')) => Ok(format!("{:<width$}", v.to_string(), width = width)),
        _ => Err(invalid()),
    }
}

impl FromStr for FormatTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FormatTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
