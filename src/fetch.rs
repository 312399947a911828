//! Streaming acquisition of the remote feed archive.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::error::ExtractError;

/// HTTP seam so the pipeline can be driven without a network in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response>;
}

/// [`HttpClient`] backed by a plain [`reqwest::Client`].
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}

/// Streams the body of `url` into the file at `dest`, one chunk at a time,
/// and returns the number of bytes written. Memory use is bounded by the
/// chunk size regardless of archive size.
///
/// # Errors
///
/// Returns [`ExtractError::Fetch`] on a transport error or non-success
/// status. A partial file may remain at `dest`; callers are expected to
/// abort the run rather than read it.
pub async fn fetch_to_file<C: HttpClient>(client: &C, url: &str, dest: &Path) -> Result<u64> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let mut resp = client
        .execute(req)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|source| ExtractError::Fetch {
            url: url.to_string(),
            source,
        })?;

    let mut file = File::create(dest)?;
    let mut written = 0u64;
    while let Some(chunk) = resp.chunk().await.map_err(|source| ExtractError::Fetch {
        url: url.to_string(),
        source,
    })? {
        file.write_all(&chunk)?;
        written += chunk.len() as u64;
    }

    debug!(url, bytes = written, "Feed archive downloaded");
    Ok(written)
}
