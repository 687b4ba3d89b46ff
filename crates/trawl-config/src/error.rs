use thiserror::Error;

/// Errors raised while validating requests or resolving configuration.
///
/// All of these are fatal and happen before a workspace exists.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The request has no (or an empty) `task` field.
  #[error("input 'task' is required")]
  MissingTask,

  /// The `url` field is not a valid absolute URI.
  #[error("invalid url '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  /// No credential in the request or in the configuration.
  #[error("{env_var} must be set in environment or input")]
  MissingCredential { env_var: &'static str },

  /// The input document could not be parsed.
  #[error("invalid input: {message}")]
  InvalidInput { message: String },

  /// An environment variable holds a value that cannot be parsed.
  #[error("invalid value for {name}: '{value}'")]
  InvalidValue { name: &'static str, value: String },
}

impl From<serde_json::Error> for ConfigError {
  fn from(err: serde_json::Error) -> Self {
    Self::InvalidInput {
      message: err.to_string(),
    }
  }
}
