//! Selection Normalization
//!
//! Customers submit style and delivery choices in several shapes depending on
//! where they come from: a JSON array in the checkout body, a JSON-encoded
//! string in checkout metadata, repeated or comma-separated multipart fields.
//! Everything funnels through [`normalize`], which yields an ordered,
//! deduplicated list restricted to the allow-list of the target type.
//!
//! ```rust,ignore
//! use portrait_core::{selection, PortraitStyle};
//!
//! let styles: Vec<PortraitStyle> =
//!     selection::normalize(&json!("royal-costume,royal-costume,cartoon-pop"));
//! assert_eq!(selection::keys(&styles), vec!["royal-costume", "cartoon-pop"]);
//! ```

use serde_json::Value;

use crate::delivery::DeliveryOption;
use crate::style::PortraitStyle;

/// A value drawn from a fixed allow-list of string keys
pub trait SelectionKey: Copy + PartialEq + 'static {
    /// Every accepted value
    const ALLOWED: &'static [Self];

    /// Wire key for this value
    fn key(&self) -> &'static str;

    /// Look up a key, ignoring surrounding whitespace and case
    fn from_key(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase();
        Self::ALLOWED.iter().copied().find(|v| v.key() == token)
    }
}

/// Normalize an arbitrary JSON value into allowed, deduplicated selections.
///
/// Arrays contribute each string element; strings may hold a JSON array,
/// a comma-separated list or a single token. Anything else is empty.
pub fn normalize<T: SelectionKey>(value: &Value) -> Vec<T> {
    let mut out = Vec::new();
    match value {
        Value::Array(items) => {
            for item in items {
                if let Value::String(s) = item {
                    push_tokens(s, &mut out);
                }
            }
        }
        Value::String(s) => push_tokens(s, &mut out),
        _ => {}
    }
    out
}

pub fn normalize_styles(value: &Value) -> Vec<PortraitStyle> {
    normalize(value)
}

pub fn normalize_delivery(value: &Value) -> Vec<DeliveryOption> {
    normalize(value)
}

/// Normalize raw form values (e.g. repeated multipart fields)
pub fn normalize_form_values<T: SelectionKey>(values: &[String]) -> Vec<T> {
    let mut out = Vec::new();
    for value in values {
        push_tokens(value, &mut out);
    }
    out
}

/// Normalize an optional string, typically a metadata entry
pub fn normalize_str<T: SelectionKey>(raw: Option<&str>) -> Vec<T> {
    let mut out = Vec::new();
    if let Some(raw) = raw {
        push_tokens(raw, &mut out);
    }
    out
}

/// Wire keys for a list of selections
pub fn keys<T: SelectionKey>(values: &[T]) -> Vec<&'static str> {
    values.iter().map(SelectionKey::key).collect()
}

fn push_tokens<T: SelectionKey>(raw: &str, out: &mut Vec<T>) {
    let raw = raw.trim();
    if raw.is_empty() {
        return;
    }

    if raw.starts_with('[') {
        // Unparsable JSON contributes nothing
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw) {
            for item in items {
                if let Value::String(s) = item {
                    push_unique(&s, out);
                }
            }
        }
        return;
    }

    for token in raw.split(',') {
        push_unique(token, out);
    }
}

fn push_unique<T: SelectionKey>(token: &str, out: &mut Vec<T>) {
    if let Some(value) = T::from_key(token) {
        if !out.contains(&value) {
            out.push(value);
        }
    }
}
