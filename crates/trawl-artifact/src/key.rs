//! Store key derivation.
//!
//! Keys are limited to `[A-Za-z0-9!-_.'()]` and [`MAX_KEY_LEN`] characters.
//! Everything else is replaced with `_`, so distinct paths can collapse to
//! the same key; the publisher resolves those collisions with [`with_suffix`].

/// Longest key a store accepts.
pub const MAX_KEY_LEN: usize = 256;

/// Extensions longer than this are not preserved on truncation.
const MAX_PRESERVED_EXT: usize = 16;

fn is_key_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || matches!(c, '!' | '-' | '_' | '.' | '\'' | '(' | ')')
}

/// Whether `key` can be written as-is. Dot-only keys are refused.
pub fn is_valid_key(key: &str) -> bool {
  !key.is_empty()
    && key.len() <= MAX_KEY_LEN
    && key.chars().all(is_key_char)
    && key.chars().any(|c| c != '.')
}

/// Replace every character a key cannot hold (path separators included) with `_`.
pub fn sanitize_segment(segment: &str) -> String {
  segment
    .chars()
    .map(|c| if is_key_char(c) { c } else { '_' })
    .collect()
}

/// Build the key for a file: `{run_id}_{category}_{path}`.
///
/// Empty parts are skipped. The result is truncated to [`MAX_KEY_LEN`],
/// keeping the extension.
pub fn derive_key(run_id: &str, category: &str, path: &str) -> String {
  let key = [run_id, category, path]
    .iter()
    .filter(|part| !part.is_empty())
    .map(|part| sanitize_segment(part))
    .collect::<Vec<_>>()
    .join("_");

  fit(&key, "")
}

/// Disambiguate `key` by inserting `-{n}` before its extension.
pub fn with_suffix(key: &str, n: usize) -> String {
  fit(key, &format!("-{}", n))
}

/// Split `key` into stem and extension (with the dot).
fn split_extension(key: &str) -> (&str, &str) {
  match key.rfind('.') {
    Some(idx) if idx > 0 && key.len() - idx <= MAX_PRESERVED_EXT => key.split_at(idx),
    _ => (key, ""),
  }
}

/// Insert `suffix` between stem and extension, shortening the stem so the
/// whole key fits. Keys are ASCII after sanitizing, so byte slicing is safe.
fn fit(key: &str, suffix: &str) -> String {
  let (stem, ext) = split_extension(key);
  let budget = MAX_KEY_LEN.saturating_sub(ext.len() + suffix.len());
  let stem = if stem.len() > budget { &stem[..budget] } else { stem };
  format!("{}{}{}", stem, suffix, ext)
}
