use std::fmt;

use serde::Deserialize;

/// A credential that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  /// Returns `None` for blank values so callers can treat them as absent.
  pub fn non_empty(value: impl Into<String>) -> Option<Self> {
    let value = value.into();
    if value.trim().is_empty() {
      None
    } else {
      Some(Self(value))
    }
  }

  /// Access the raw value. Only call this at the boundary that needs it.
  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Secret(***)")
  }
}
