//! Parsing of `git count-objects -v` output.
//!
//! The command prints one `key value` pair per line. Newer Git versions put a
//! colon after the key (`size-pack: 1234`); both shapes are accepted. Lines
//! that do not match are skipped, so unexpected output degrades to missing
//! fields instead of an error.

use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::error::AnalysisError;

/// Loose-object size field, reported in KiB.
pub const SIZE_FIELD: &str = "size";

/// Packfile size field, reported in KiB.
pub const SIZE_PACK_FIELD: &str = "size-pack";

/// Fields that `git count-objects -v` reports in kibibytes.
const KIB_FIELDS: [&str; 2] = [SIZE_FIELD, SIZE_PACK_FIELD];

/// `<field-name>[:] <non-negative integer>`, nothing else on the line.
static LINE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][A-Za-z0-9-]*):?\s+([0-9]+)$").ok());

/// How strictly the parser treats output that carries no size information.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ParseMode {
    /// Skip anything unrecognized; missing fields count as zero
    #[default]
    Lenient,

    /// Reject output that contains neither `size` nor `size-pack`
    Strict,
}

/// Field name to value mapping extracted from the counting command.
///
/// `size` and `size-pack` are stored in bytes; every other field keeps the
/// integer the command printed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParsedFields(BTreeMap<String, u64>);

impl ParsedFields {
    /// Value of `field`, if it was present in the output.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<u64> {
        self.0.get(field).copied()
    }

    /// Whether at least one of the byte-valued fields was recognized.
    #[must_use]
    pub fn has_size_fields(&self) -> bool {
        KIB_FIELDS.iter().any(|field| self.0.contains_key(*field))
    }

    /// Number of fields parsed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no field was parsed at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(field, value)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for ParsedFields {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Parse counting-command output leniently.
///
/// Malformed lines are ignored and never cause a failure.
///
/// # Examples
///
/// ```
/// # use git_space_analyzer::parser::parse;
/// let fields = parse(&["size 100", "size-pack 200", "garbage-line-no-number"]);
/// assert_eq!(fields.get("size"), Some(102_400));
/// assert_eq!(fields.get("size-pack"), Some(204_800));
/// ```
#[must_use]
pub fn parse<S: AsRef<str>>(lines: &[S]) -> ParsedFields {
    let mut fields = BTreeMap::new();

    for line in lines {
        let line = line.as_ref();
        if let Some((field, value)) = parse_line(line) {
            fields.insert(field.to_string(), value);
        } else {
            tracing::trace!(line, "skipping unrecognized count-objects line");
        }
    }

    ParsedFields(fields)
}

/// Parse counting-command output under the given [`ParseMode`].
///
/// # Errors
///
/// In [`ParseMode::Strict`], returns [`AnalysisError::ParseFailed`] when none
/// of the size fields is present. [`ParseMode::Lenient`] never fails.
pub fn parse_with_mode<S: AsRef<str>>(
    lines: &[S],
    mode: ParseMode,
) -> Result<ParsedFields, AnalysisError> {
    let fields = parse(lines);

    if mode == ParseMode::Strict && !fields.has_size_fields() {
        return Err(AnalysisError::ParseFailed {
            reason: format!(
                "none of the expected fields ({}) found in {} line(s) of output",
                KIB_FIELDS.join(", "),
                lines.len()
            ),
        });
    }

    Ok(fields)
}

/// Split a single line into a field name and its normalized value.
fn parse_line(line: &str) -> Option<(&str, u64)> {
    let pattern = LINE_PATTERN.as_ref()?;
    let captures = pattern.captures(line.trim())?;

    let field = captures.get(1)?.as_str();
    let raw: u64 = captures.get(2)?.as_str().parse().ok()?;

    let value = if KIB_FIELDS.contains(&field) {
        raw.checked_mul(1024)?
    } else {
        raw
    };

    Some((field, value))
}
