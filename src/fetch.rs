use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Attempts per fetch, including the first one.
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("origin returned {status} after {attempts} attempts")]
    Status { status: StatusCode, attempts: u32 },
    #[error("transport error after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
}

/// Retrieves a CSV resource as text. Implemented over HTTP in production and
/// by in-memory stubs in tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_csv(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent("estiba-sync/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Self { http }
    }

    async fn attempt(&self, url: &str) -> Result<String, AttemptError> {
        let res = self
            .http
            .get(url)
            .header("Accept", "text/csv,text/plain,*/*")
            .header("Cache-Control", "no-store")
            .send()
            .await
            .map_err(AttemptError::Transport)?;

        if !res.status().is_success() {
            return Err(AttemptError::Status(res.status()));
        }

        // Decode the raw bytes as UTF-8 ourselves; the origin's declared
        // charset is unreliable and silently mangles accented characters.
        let bytes = res.bytes().await.map_err(AttemptError::Transport)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

enum AttemptError {
    Status(StatusCode),
    Transport(reqwest::Error),
}

impl AttemptError {
    fn into_fetch_error(self, attempts: u32) -> FetchError {
        match self {
            AttemptError::Status(status) => FetchError::Status { status, attempts },
            AttemptError::Transport(source) => FetchError::Transport { attempts, source },
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_csv(&self, url: &str) -> Result<String, FetchError> {
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                // Exponential backoff: 2s before the second attempt, 4s
                // before the third.
                let delay = Duration::from_secs(1 << (attempt - 1));
                tokio::time::sleep(delay).await;
            }
            match self.attempt(url).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    warn!(url, attempt, "fetch attempt failed");
                    last_err = Some(err);
                }
            }
        }
        // last_err is always set when all attempts failed
        Err(last_err
            .map(|e| e.into_fetch_error(MAX_ATTEMPTS))
            .unwrap_or(FetchError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                attempts: MAX_ATTEMPTS,
            }))
    }
}
