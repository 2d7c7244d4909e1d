//! Validation for submissions and configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::config::ClientConfig;
use crate::types::DownloadRequest;

const MAX_SENSIBLE_QUANTUM_MS: u64 = 5_000;

/// A submission that must not reach the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("url is required")]
    MissingUrl,
    #[error("invalid url: {url}")]
    InvalidUrl { url: String },
    #[error("format is required")]
    MissingFormat,
    #[error("save path is required")]
    MissingSavePath,
}

impl ValidationError {
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::MissingUrl => "Enter a video link first".to_string(),
            ValidationError::InvalidUrl { .. } => {
                "Invalid video link, enter a URL starting with http:// or https://".to_string()
            }
            ValidationError::MissingFormat => "Choose a resolution".to_string(),
            ValidationError::MissingSavePath => "Choose a save location".to_string(),
        }
    }
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^https?://.+").expect("static url pattern"))
}

/// Returns true if `url` (after trimming) is an http(s) URL with a body.
pub fn is_valid_url(url: &str) -> bool {
    url_pattern().is_match(url.trim())
}

/// Check a url on its own, as the probe step does.
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingUrl);
    }
    if !is_valid_url(trimmed) {
        return Err(ValidationError::InvalidUrl {
            url: trimmed.to_string(),
        });
    }
    Ok(())
}

/// Check every field of a submission. Fields are checked in form order so
/// the first missing control is reported.
pub fn validate_request(request: &DownloadRequest) -> Result<(), ValidationError> {
    validate_url(&request.url)?;
    if request.format_id.trim().is_empty() {
        return Err(ValidationError::MissingFormat);
    }
    if request.save_path.as_os_str().is_empty()
        || request.save_path.to_string_lossy().trim().is_empty()
    {
        return Err(ValidationError::MissingSavePath);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    pub code: &'static str,
    pub message: String,
}

pub trait Validate {
    fn validate(&self) -> Vec<ValidationIssue>;
}

impl Validate for ClientConfig {
    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.progress.coalesce_ms == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "progress.coalesce_ms.zero",
                message: "coalesce quantum must be greater than zero".to_string(),
            });
        } else if self.progress.coalesce_ms > MAX_SENSIBLE_QUANTUM_MS {
            issues.push(ValidationIssue {
                level: ValidationLevel::Warning,
                code: "progress.coalesce_ms.high",
                message: format!(
                    "coalesce quantum {}ms is very high; progress will look frozen",
                    self.progress.coalesce_ms
                ),
            });
        }

        if self.retry.attempts == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "retry.attempts.zero",
                message: "retry attempts must be at least 1".to_string(),
            });
        }

        if self.downloads.preferred_height == 0 {
            issues.push(ValidationIssue {
                level: ValidationLevel::Error,
                code: "downloads.preferred_height.zero",
                message: "preferred height must be greater than zero".to_string(),
            });
        }

        if let Some(path) = &self.downloads.save_path {
            if path.as_os_str().is_empty() {
                issues.push(ValidationIssue {
                    level: ValidationLevel::Warning,
                    code: "downloads.save_path.empty",
                    message: "save_path is set but empty".to_string(),
                });
            }
        }

        issues
    }
}
