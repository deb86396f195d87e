use num::Float;
use std::cmp::Ordering;

/// Total ordering over floats that sorts NaN before every number.
pub fn nan_safe_compare<T: Float>(i: &T, j: &T) -> Ordering {
    match (i.is_nan(), j.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => i.partial_cmp(j).unwrap_or(Ordering::Equal),
    }
}
