//! HTTP retry helpers for transient errors.
//!
//! Every adapter goes through [`send_json`] instead of calling
//! `reqwest::RequestBuilder::send()` directly, so each request gets
//! exponential backoff on timeouts, connection resets, HTTP 429, and 5xx.
//! Query parameters that carry credentials are masked before anything is
//! logged.
//!
//! ```ignore
//! let body = retry::send_json(&settings, &url, &params, || {
//!     client.get(&url).query(&params)
//! })
//! .await?;
//! ```

use crate::{HttpSettings, SourceError};

/// Maximum length of the response body preview included in logs.
const BODY_PREVIEW_LEN: usize = 2000;

/// Parameter names whose values are never logged.
const SECRET_PARAMS: &[&str] = &["apikey", "api_key", "key", "token"];

/// Returns `params` with secret values replaced by `***`.
#[must_use]
pub fn mask_params(params: &[(&str, String)]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(name, value)| {
            let shown = if SECRET_PARAMS.contains(&name.to_ascii_lowercase().as_str()) {
                "***".to_string()
            } else {
                value.clone()
            };
            ((*name).to_string(), shown)
        })
        .collect()
}

fn preview(text: &str) -> String {
    if text.len() > BODY_PREVIEW_LEN {
        let truncated: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

/// Sends a request and parses the response body as JSON.
///
/// `build_request` is called on each attempt because builders are
/// consumed by `.send()`. `url` and `params` are only used for logging.
///
/// # Errors
///
/// Returns [`SourceError`] if the request fails after all retries, the
/// server returns a non-retryable status, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    settings: &HttpSettings,
    url: &str,
    params: &[(&str, String)],
    build_request: F,
) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let masked = mask_params(params);
    let response = send_inner(settings, url, &build_request).await?;
    let status = response.status();
    let text = response.text().await?;

    log::info!("HTTP JSON GET {url} status={status} params={masked:?}");
    log::debug!("HTTP JSON GET {url} preview={}", preview(&text));

    serde_json::from_str(&text).map_err(|e| {
        log::warn!(
            "JSON parse failed for {url}: {e} (received {} bytes)",
            text.len()
        );
        SourceError::Json(e)
    })
}

/// Core retry loop. Returns the first 2xx/3xx response.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    settings: &HttpSettings,
    url: &str,
    build_request: &F,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let max_retries = settings.max_retries;
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            let delay = settings.backoff_base * (1u32 << (attempt - 1).min(16));
            log::warn!("  retry {attempt}/{max_retries} for {url} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(SourceError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if (status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error())
                    && attempt < max_retries
                {
                    log::warn!("  HTTP {status} from {url}");
                    attempt += 1;
                    continue;
                }

                if status.is_client_error() || status.is_server_error() {
                    return Err(SourceError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
