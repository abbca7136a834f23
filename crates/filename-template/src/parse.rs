//! Field extraction from filenames matched by a search pattern.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, TemplateError};
use crate::search::SearchPattern;
use crate::template::{FormatTemplate, Segment};

/// Raw field values pulled from a list of filenames.
///
/// Every per-field vector has one entry per retained filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFieldSet {
    template: FormatTemplate,
    files: Vec<String>,
    values: BTreeMap<String, Vec<String>>,
}

impl ParsedFieldSet {
    fn empty(template: &FormatTemplate, keys: &[String]) -> Self {
        Self {
            template: template.clone(),
            files: Vec::new(),
            values: keys.iter().map(|k| (k.clone(), Vec::new())).collect(),
        }
    }

    fn push(&mut self, file: &str, row: Vec<(&str, String)>) {
        // A field repeated in the template keeps its last occurrence.
        let row: BTreeMap<&str, String> = row.into_iter().collect();
        for (key, value) in row {
            self.values.entry(key.to_string()).or_default().push(value);
        }
        self.files.push(file.to_string());
    }

    pub fn template(&self) -> &FormatTemplate {
        &self.template
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Values of `field`, or `None` if the template never mentions it.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.values.get(field).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Convert a two-digit year to four digits around `year_break`.
///
/// Years at or above the break land in the 1900s, years below it in the
/// 2000s. Without a break the year is returned unchanged.
pub fn expand_two_digit_year(year: i32, year_break: Option<i32>) -> i32 {
    match year_break {
        Some(b) if year >= b => year + 1900,
        Some(_) => year + 2000,
        None => year,
    }
}

/// Slice field values out of each filename by byte offset.
///
/// Offsets are measured from the end of the name, so a variable-length
/// prefix (such as a directory) does not shift them.
pub fn extract_fixed_width<S: AsRef<str>>(
    files: &[S],
    template: &FormatTemplate,
) -> Result<ParsedFieldSet> {
    let search = SearchPattern::fixed_width(template)?;
    let widths = search.fixed_widths().ok_or_else(|| TemplateError::UnknownWidth {
        field: template.to_string(),
    })?;

    let mut spans = Vec::with_capacity(widths.len());
    let mut idx = 0usize;
    for (fragment, width) in search.fragments.iter().zip(&widths) {
        idx += fragment.len();
        spans.push((idx, idx + width));
        idx += width;
    }
    let total = idx + search.fragments.last().map(String::len).unwrap_or(0);

    let mut parsed = ParsedFieldSet::empty(template, &search.keys);
    'files: for file in files {
        let name = file.as_ref();
        if name.len() < total {
            debug!(file = %name, expected = total, "Filename shorter than template, skipping");
            continue;
        }
        let shift = name.len() - total;

        let mut row = Vec::with_capacity(spans.len());
        for (key, (begin, end)) in search.keys.iter().zip(&spans) {
            match name.get(begin + shift..end + shift) {
                Some(value) => row.push((key.as_str(), value.to_string())),
                None => {
                    debug!(file = %name, field = %key, "Field not on a character boundary, skipping");
                    continue 'files;
                }
            }
        }
        parsed.push(name, row);
    }

    Ok(parsed)
}

/// One delimiter-separated group of the template.
#[derive(Debug, Default)]
struct Group {
    pieces: Vec<Piece>,
}

#[derive(Debug)]
enum Piece {
    Literal(String),
    Field { name: String, width: Option<usize> },
}

impl Group {
    fn field_count(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| matches!(p, Piece::Field { .. }))
            .count()
    }
}

fn split_groups(template: &FormatTemplate, delimiter: &str) -> Vec<Group> {
    let mut groups = vec![Group::default()];
    for segment in template.segments() {
        match segment {
            Segment::Literal(text) => {
                let mut parts = text.split(delimiter);
                if let (Some(first), Some(current)) = (parts.next(), groups.last_mut()) {
                    if !first.is_empty() {
                        current.pieces.push(Piece::Literal(first.to_string()));
                    }
                }
                for part in parts {
                    let mut group = Group::default();
                    if !part.is_empty() {
                        group.pieces.push(Piece::Literal(part.to_string()));
                    }
                    groups.push(group);
                }
            }
            Segment::Field(field) => {
                if let Some(current) = groups.last_mut() {
                    current.pieces.push(Piece::Field {
                        name: field.name().to_string(),
                        width: field.width(),
                    });
                }
            }
        }
    }
    groups
}

/// Pull the field values out of one delimited segment of a filename.
fn parse_group<'g>(group: &'g Group, segment: &str) -> Option<Vec<(&'g str, String)>> {
    let mut row = Vec::new();

    if group.field_count() == 1 {
        let (mut prefix, mut suffix) = (String::new(), String::new());
        let mut name: &'g str = "";
        for piece in &group.pieces {
            match piece {
                Piece::Literal(text) if name.is_empty() => prefix.push_str(text),
                Piece::Literal(text) => suffix.push_str(text),
                Piece::Field { name: field, .. } => name = field.as_str(),
            }
        }
        let value = segment.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
        row.push((name, value.to_string()));
        return Some(row);
    }

    // Several fixed-width fields in one segment, sliced from the front.
    let mut rest = segment;
    for piece in &group.pieces {
        match piece {
            Piece::Literal(text) => rest = rest.strip_prefix(text.as_str())?,
            Piece::Field { name, width } => {
                let width = (*width)?;
                row.push((name.as_str(), rest.get(..width)?.to_string()));
                rest = rest.get(width..)?;
            }
        }
    }
    rest.is_empty().then_some(row)
}

/// Split each filename on `delimiter` and align segments with template fields.
///
/// Literal text sharing a segment with a field is stripped. A segment may
/// hold several fields only if all of them declare widths.
pub fn extract_delimited<S: AsRef<str>>(
    files: &[S],
    template: &FormatTemplate,
    delimiter: &str,
) -> Result<ParsedFieldSet> {
    if delimiter.is_empty() {
        return Err(TemplateError::EmptyDelimiter);
    }
    let search = SearchPattern::wildcard(template)?;
    let groups = split_groups(template, delimiter);

    for group in groups.iter().filter(|g| g.field_count() > 1) {
        let fields: Vec<String> = group
            .pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Field { name, width: None } => Some(name.clone()),
                _ => None,
            })
            .collect();
        if !fields.is_empty() {
            return Err(TemplateError::AmbiguousSegment { fields });
        }
    }

    let mut parsed = ParsedFieldSet::empty(template, &search.keys);
    'files: for file in files {
        let name = file.as_ref();
        let segments: Vec<&str> = name.split(delimiter).collect();
        if segments.len() != groups.len() {
            debug!(
                file = %name,
                segments = segments.len(),
                expected = groups.len(),
                "Delimited segment count mismatch, skipping"
            );
            continue;
        }

        let mut row = Vec::new();
        for (group, segment) in groups.iter().zip(&segments) {
            if group.field_count() == 0 {
                continue;
            }
            match parse_group(group, segment) {
                Some(values) => row.extend(values),
                None => {
                    debug!(file = %name, segment = %segment, "Segment does not match template, skipping");
                    continue 'files;
                }
            }
        }
        parsed.push(name, row);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(s: &str) -> FormatTemplate {
        FormatTemplate::parse(s).unwrap()
    }

    #[test]
    fn test_fixed_width_extraction() {
        let t = template("{year:04d}-{month:02d}-{day:02d}.nofile");
        let parsed = extract_fixed_width(&["2008-01-05.nofile", "2009-12-31.nofile"], &t).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("year").unwrap(), ["2008", "2009"]);
        assert_eq!(parsed.get("month").unwrap(), ["01", "12"]);
        assert_eq!(parsed.get("day").unwrap(), ["05", "31"]);
        assert!(parsed.get("version").is_none());
    }

    #[test]
    fn test_fixed_width_uses_tail_offsets() {
        let t = template("{year:04d}{month:02d}.nc");
        let parsed = extract_fixed_width(&["nested/dir/200801.nc"], &t).unwrap();
        assert_eq!(parsed.get("year").unwrap(), ["2008"]);
        assert_eq!(parsed.files(), ["nested/dir/200801.nc"]);
    }

    #[test]
    fn test_fixed_width_skips_short_names() {
        let t = template("{year:04d}{month:02d}{day:02d}.cdf");
        let parsed = extract_fixed_width(&["0101.cdf", "20080101.cdf"], &t).unwrap();
        assert_eq!(parsed.files(), ["20080101.cdf"]);
    }

    #[test]
    fn test_empty_input_keeps_template() {
        let t = template("{year:04d}{day:03d}.cdf");
        let parsed = extract_fixed_width::<&str>(&[], &t).unwrap();
        assert!(parsed.is_empty());
        assert_eq!(parsed.template(), &t);
        assert_eq!(parsed.get("year").unwrap().len(), 0);
    }

    #[test]
    fn test_delimited_extraction() {
        let t = template("cnofs_vefi_{year:04d}_{month:02d}_{day:02d}_v{version}.cdf");
        let files = [
            "cnofs_vefi_2009_01_02_v1.cdf",
            "cnofs_vefi_2009_01_03_v12.cdf",
        ];
        let parsed = extract_delimited(&files, &t, "_").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.get("day").unwrap(), ["02", "03"]);
        assert_eq!(parsed.get("version").unwrap(), ["1", "12"]);
    }

    #[test]
    fn test_delimited_segment_with_fixed_fields() {
        let t = template("si_{year:04d}{month:02d}{day:02d}_{revision}.txt");
        let parsed = extract_delimited(&["si_20100101_3.txt"], &t, "_").unwrap();
        assert_eq!(parsed.get("month").unwrap(), ["01"]);
        assert_eq!(parsed.get("revision").unwrap(), ["3"]);
    }

    #[test]
    fn test_delimited_ambiguous_segment() {
        let t = template("si_{year}{month}_{day:02d}.txt");
        assert!(matches!(
            extract_delimited::<&str>(&[], &t, "_"),
            Err(TemplateError::AmbiguousSegment { .. })
        ));
    }

    #[test]
    fn test_delimited_skips_mismatched_names() {
        let t = template("data_{year:04d}_{day:03d}.cdf");
        let parsed =
            extract_delimited(&["data_2010_001.cdf", "data_extra_2010_002.cdf"], &t, "_").unwrap();
        assert_eq!(parsed.files(), ["data_2010_001.cdf"]);
    }

    #[test]
    fn test_two_digit_years() {
        assert_eq!(expand_two_digit_year(99, Some(50)), 1999);
        assert_eq!(expand_two_digit_year(50, Some(50)), 1950);
        assert_eq!(expand_two_digit_year(7, Some(50)), 2007);
        assert_eq!(expand_two_digit_year(2007, None), 2007);
    }
}
