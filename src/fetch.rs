//! Guarded HTTP fetching with redirect validation.
//!
//! Every hop in a redirect chain goes through [`resolve_pinned`] and the
//! connection is made to the pinned address, so neither a redirect nor a
//! second DNS answer can steer the request somewhere the guard refused.

use reqwest::redirect::Policy as RedirectPolicy;
use reqwest::{Client, Response};
use tracing::debug;

use crate::error::Error;
use crate::guard::Guard;
use crate::resolve::{resolve_pinned, Pinned};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: u8 = 10;

/// Result of a fetch operation, including the redirect chain.
#[derive(Debug)]
pub struct FetchResult {
    /// The final HTTP response.
    pub response: Response,

    /// Chain of pinned URLs that were followed (including the original).
    pub chain: Vec<Pinned>,
}

/// GET a URL, following redirects only through URLs the guard accepts.
///
/// # Example
///
/// ```rust,no_run
/// use fetchgate::{fetch, Guard};
///
/// # async fn example() -> Result<(), fetchgate::Error> {
/// let result = fetch(&Guard::default(), "https://httpbin.org/redirect/2").await?;
/// println!("Final URL: {}", result.response.url());
/// println!("Followed {} redirects", result.chain.len() - 1);
/// # Ok(())
/// # }
/// ```
pub async fn fetch(guard: &Guard, url: &str) -> Result<FetchResult, Error> {
    let mut current_url = url.to_string();
    let mut chain: Vec<Pinned> = Vec::new();

    loop {
        let pinned = check_hop(guard, url, &current_url, chain.len()).await?;

        // Connect to the pinned address; Host header and SNI keep the name
        let client = Client::builder()
            .redirect(RedirectPolicy::none())
            .resolve(&pinned.host, pinned.to_socket_addr())
            .build()
            .map_err(|e| http_error(&current_url, e))?;

        let response = client
            .get(&pinned.url)
            .send()
            .await
            .map_err(|e| http_error(&current_url, e))?;

        let hop_url = pinned.url.clone();
        chain.push(pinned);

        if !response.status().is_redirection() {
            return Ok(FetchResult { response, chain });
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| Error::HttpError {
                url: current_url.clone(),
                message: "Redirect without Location header".to_string(),
            })?;

        current_url = resolve_redirect_url(&hop_url, location)?;
        debug!(from = %hop_url, to = %current_url, hop = chain.len(), "following redirect");
    }
}

/// Pin the URL for hop number `hop` (0 is the URL the caller passed in).
///
/// A rejected redirect target is reported as [`Error::RedirectBlocked`];
/// the first hop keeps the guard's own error.
async fn check_hop(guard: &Guard, original: &str, current: &str, hop: usize) -> Result<Pinned, Error> {
    if hop > usize::from(MAX_REDIRECTS) {
        return Err(Error::TooManyRedirects {
            url: original.to_string(),
            max: MAX_REDIRECTS,
        });
    }

    resolve_pinned(guard, current).await.map_err(|e| {
        if hop == 0 {
            e
        } else {
            Error::RedirectBlocked {
                original_url: original.to_string(),
                redirect_url: current.to_string(),
                reason: e.to_string(),
            }
        }
    })
}

/// Synchronous version of [`fetch`].
///
/// # Panics
///
/// Panics if called from within a current-thread Tokio runtime, where
/// `block_in_place` is not available.
pub fn fetch_sync(guard: &Guard, url: &str) -> Result<FetchResult, Error> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        tokio::task::block_in_place(|| handle.block_on(fetch(guard, url)))
    } else {
        let rt = tokio::runtime::Runtime::new().map_err(|e| http_error(url, e))?;
        rt.block_on(fetch(guard, url))
    }
}

fn http_error(url: &str, e: impl std::fmt::Display) -> Error {
    Error::HttpError {
        url: url.to_string(),
        message: e.to_string(),
    }
}

/// Resolve a redirect URL (which may be relative) against the base URL.
fn resolve_redirect_url(base: &str, location: &str) -> Result<String, Error> {
    let base_url = url::Url::parse(base).map_err(|e| http_error(base, e))?;
    let resolved = base_url.join(location).map_err(|e| http_error(location, e))?;
    Ok(resolved.to_string())
}
