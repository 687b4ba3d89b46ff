//! Submission of generated llms.txt documents to the style guide service.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trawl_config::Secret;

const SUBMIT_PATH: &str = "/api/submit-llms-txt";
const SECRET_HEADER: &str = "X-Actor-Secret";

/// Outcome of a submission attempt. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<u16>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response: Option<serde_json::Value>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Serialize)]
struct Payload<'a> {
  domain: &'a str,
  llms_txt: &'a str,
}

/// The endpoint for a service base URL.
pub fn submission_url(base_url: &str) -> String {
  format!("{}{}", base_url.trim().trim_end_matches('/'), SUBMIT_PATH)
}

#[derive(Debug, Clone, Default)]
pub struct Submitter {
  client: Client,
}

impl Submitter {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn submit(
    &self,
    base_url: &str,
    secret: &Secret,
    domain: &str,
    llms_txt: &str,
  ) -> Submission {
    let url = submission_url(base_url);
    info!(url = %url, domain = %domain, "llms_txt_submitting");

    let response = match self
      .client
      .post(&url)
      .header(SECRET_HEADER, secret.expose())
      .json(&Payload { domain, llms_txt })
      .send()
      .await
    {
      Ok(response) => response,
      Err(e) => {
        warn!(url = %url, error = %e, "llms_txt_submit_failed");
        return Submission {
          success: false,
          status: None,
          response: None,
          error: Some(e.to_string()),
        };
      }
    };

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));

    if status.is_success() {
      info!(domain = %domain, status = status.as_u16(), "llms_txt_submitted");
      Submission {
        success: true,
        status: Some(status.as_u16()),
        response: Some(body),
        error: None,
      }
    } else {
      warn!(domain = %domain, status = status.as_u16(), "llms_txt_submit_failed");
      Submission {
        success: false,
        status: Some(status.as_u16()),
        response: Some(body),
        error: Some(format!("submission rejected with status {}", status.as_u16())),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_submission_url() {
    assert_eq!(
      submission_url("https://styleguide.fyi"),
      "https://styleguide.fyi/api/submit-llms-txt"
    );
    assert_eq!(
      submission_url("http://localhost:5000/"),
      "http://localhost:5000/api/submit-llms-txt"
    );
  }

  #[tokio::test]
  async fn test_unreachable_service_is_reported() {
    let submission = Submitter::new()
      .submit("http://127.0.0.1:9", &Secret::new("s"), "example.com", "# x")
      .await;

    assert!(!submission.success);
    assert!(submission.status.is_none());
    assert!(submission.error.is_some());
  }
}
