use thiserror::Error;

/// Errors crossing a service boundary (backend, third-party APIs, account flows).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not authenticated")]
    NotAuthenticated,

    /// Input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("network request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("unexpected response from {service}: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("local storage: {0:#}")]
    Storage(anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// True when the request never got a usable answer from the remote side.
    pub fn is_network(&self) -> bool {
        match self {
            AppError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            _ => false,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Map a non-success response into `AppError::Api`, keeping a short body excerpt.
pub async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Api {
        service,
        status: status.as_u16(),
        message: api_message(&body),
    })
}

/// Pull a human readable message out of an error body.
fn api_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(s) = v.get(key).and_then(|m| m.as_str()) {
                return s.to_string();
            }
        }
    }
    body.chars().take(200).collect()
}
