//! Entity id helpers.
//!
//! Ids are opaque strings that hold the decimal text of a small positive
//! integer (`"1"`, `"17"`). Each entity kind has its own id space. Only two
//! operations ever look inside an id:
//!
//! - **Allocation**: new chapters and scenes get `max(existing) + 1`
//!   ([`next_id`]); project variables get the smallest free id ([`create_id`]).
//! - **Ordering**: when no ordering list applies, ids sort by numeric value so
//!   `"10"` follows `"9"` ([`sort_ids`]).
//!
//! Ids that are not numbers are kept and carried around unchanged, they are
//! just ignored for allocation and sorted after all numeric ids.

use std::cmp::Ordering;

/// Numeric value of an id, if it has one.
pub fn id_number(id: &str) -> Option<u32> {
    id.trim().parse().ok()
}

/// Highest numeric id, or 0 if there is none.
pub fn max_id<'a>(ids: impl IntoIterator<Item = &'a String>) -> u32 {
    ids.into_iter()
        .filter_map(|id| id_number(id))
        .max()
        .unwrap_or(0)
}

/// The id following the highest existing one.
pub fn next_id<'a>(ids: impl IntoIterator<Item = &'a String>) -> String {
    (max_id(ids) + 1).to_string()
}

/// The smallest positive id not yet in use.
pub fn create_id(existing: &[String]) -> String {
    let mut i: u32 = 1;
    while existing.iter().any(|id| id_number(id) == Some(i)) {
        i += 1;
    }
    i.to_string()
}

/// Compare ids numerically, falling back to text for non-numeric ids.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (id_number(a), id_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

pub fn sort_ids(ids: &mut [String]) {
    ids.sort_by(|a, b| compare_ids(a, b));
}
