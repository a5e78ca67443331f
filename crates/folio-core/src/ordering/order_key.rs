//! Fractional order keys for sibling blocks
//!
//! Keys are strings over a base-62 alphabet whose ASCII order matches digit
//! order, so plain string comparison gives document order. Between any two
//! valid keys another valid key exists: when the first differing digits are
//! adjacent the key grows by one digit instead of failing.
//!
//! A valid key is non-empty, uses only alphabet characters and never ends in
//! the zero digit. Nothing sorts between `k` and `k0`, so keys ending in `0`
//! would block later insertions.

use crate::errors::OrderKeyError;
use crate::model::SiblingKey;
use crate::patch::Place;

/// Digit alphabet in ascending ASCII order
pub const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const BASE: usize = DIGITS.len();

/// Key given to the first block of an empty sibling list
pub const INITIAL_KEY: &str = "V";

fn digit_value(c: u8) -> Option<usize> {
    match c {
        b'0'..=b'9' => Some((c - b'0') as usize),
        b'A'..=b'Z' => Some((c - b'A') as usize + 10),
        b'a'..=b'z' => Some((c - b'a') as usize + 36),
        _ => None,
    }
}

/// Check that `key` can take part in midpoint generation
///
/// # Errors
///
/// Returns `InvalidKey` for empty keys, characters outside `0-9A-Za-z`, or a
/// trailing `0`.
pub fn validate_order_key(key: &str) -> Result<(), OrderKeyError> {
    let invalid = |reason: &str| OrderKeyError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if key.is_empty() {
        return Err(invalid("key must not be empty"));
    }
    if key.bytes().any(|c| digit_value(c).is_none()) {
        return Err(invalid("key may only contain 0-9, A-Z and a-z"));
    }
    if key.ends_with('0') {
        return Err(invalid("key must not end with '0'"));
    }
    Ok(())
}

/// Generate a key strictly between `lower` and `upper`
///
/// `None` means unbounded on that side.
///
/// # Errors
///
/// Returns `InvalidKey` if a bound is not a valid key and `NoKeyBetween` if
/// `lower >= upper`.
pub fn key_between(lower: Option<&str>, upper: Option<&str>) -> Result<String, OrderKeyError> {
    if let Some(key) = lower {
        validate_order_key(key)?;
    }
    if let Some(key) = upper {
        validate_order_key(key)?;
    }
    if let (Some(lo), Some(hi)) = (lower, upper) {
        if lo >= hi {
            return Err(OrderKeyError::NoKeyBetween {
                lower: lo.to_string(),
                upper: hi.to_string(),
            });
        }
    }

    let digits = midpoint(lower.unwrap_or("").as_bytes(), upper.map(str::as_bytes));
    // Every byte comes from DIGITS, which is ASCII.
    Ok(digits.into_iter().map(char::from).collect())
}

/// Midpoint of two digit strings; `a < b`, neither ends in the zero digit
///
/// `a` is padded with zero digits where shorter than `b`.
fn midpoint(a: &[u8], b: Option<&[u8]>) -> Vec<u8> {
    if let Some(b) = b {
        let mut n = 0;
        while n < b.len() && a.get(n).copied().unwrap_or(DIGITS[0]) == b[n] {
            n += 1;
        }
        if n > 0 {
            let rest_a = a.get(n..).unwrap_or(&[]);
            let mut out = b[..n].to_vec();
            out.extend(midpoint(rest_a, Some(&b[n..])));
            return out;
        }
    }

    let da = a.first().and_then(|c| digit_value(*c)).unwrap_or(0);
    let db = b
        .and_then(|b| b.first())
        .and_then(|c| digit_value(*c))
        .unwrap_or(BASE);

    if db - da > 1 {
        vec![DIGITS[(da + db) / 2]]
    } else if let Some(b) = b.filter(|b| b.len() > 1) {
        // b's first digit alone sorts above a and below b
        vec![b[0]]
    } else {
        let mut out = vec![DIGITS[da]];
        out.extend(midpoint(a.get(1..).unwrap_or(&[]), None));
        out
    }
}

/// Resolve the order key for a block placed among `siblings`
///
/// `siblings` must be sorted by `order_key` and must not contain the block
/// being placed. An explicit key is returned unchanged; its uniqueness is the
/// caller's responsibility (see [`is_order_key_unique`]). Without a place the
/// block goes to the end.
///
/// # Errors
///
/// - `SiblingNotFound` when a `before`/`after` sibling is not in `siblings`
/// - `InvalidKey` / `NoKeyBetween` when stored sibling keys are malformed
pub fn generate_order_key(
    siblings: &[SiblingKey],
    place: Option<&Place>,
    explicit_key: Option<&str>,
) -> Result<String, OrderKeyError> {
    if let Some(key) = explicit_key {
        return Ok(key.to_string());
    }

    let first = siblings.first().map(|s| s.order_key.as_str());
    let last = siblings.last().map(|s| s.order_key.as_str());

    match place.unwrap_or(&Place::End) {
        Place::Start => key_between(None, first),
        Place::End => key_between(last, None),
        Place::Before { sibling_block_id } => {
            let idx = position_of(siblings, sibling_block_id)?;
            let lower = idx
                .checked_sub(1)
                .map(|prev| siblings[prev].order_key.as_str());
            key_between(lower, Some(&siblings[idx].order_key))
        }
        Place::After { sibling_block_id } => {
            let idx = position_of(siblings, sibling_block_id)?;
            let upper = siblings.get(idx + 1).map(|next| next.order_key.as_str());
            key_between(Some(&siblings[idx].order_key), upper)
        }
    }
}

fn position_of(siblings: &[SiblingKey], sibling_block_id: &str) -> Result<usize, OrderKeyError> {
    siblings
        .iter()
        .position(|s| s.id == sibling_block_id)
        .ok_or_else(|| OrderKeyError::SiblingNotFound {
            sibling_block_id: sibling_block_id.to_string(),
        })
}

/// True iff no sibling already uses `key`
pub fn is_order_key_unique(siblings: &[SiblingKey], key: &str) -> bool {
    !siblings.iter().any(|s| s.order_key == key)
}
