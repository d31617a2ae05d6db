//! Combines parsed fields into a single repository size.
//!
//! The total is loose-object storage plus packfile storage. Garbage, prunable
//! objects and the various counters are deliberately left out: this measures
//! the object database, not the full on-disk footprint of `.git/`.

use crate::parser::{ParsedFields, SIZE_FIELD, SIZE_PACK_FIELD};

/// Total object storage in bytes: `size + size-pack`.
///
/// Missing fields count as zero. The sum saturates at `u64::MAX`.
///
/// # Examples
///
/// ```
/// # use git_space_analyzer::{aggregator::aggregate, parser::parse};
/// assert_eq!(aggregate(&parse(&["size 100", "size-pack 200"])), 307_200);
/// ```
#[must_use]
pub fn aggregate(fields: &ParsedFields) -> u64 {
    let loose = fields.get(SIZE_FIELD).unwrap_or(0);
    let packed = fields.get(SIZE_PACK_FIELD).unwrap_or(0);

    loose.saturating_add(packed)
}
