use std::borrow::Cow;

use thiserror::Error;
use url::Url;

/// Errors from source URL normalization.
#[derive(Debug, Error)]
pub enum UrlError {
    /// The URL string could not be parsed.
    #[error("invalid URL: {0}")]
    Invalid(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("unsupported scheme '{0}' (only http/https)")]
    UnsupportedScheme(String),
}

/// Normalizes a user-supplied source URL.
///
/// A bare `host/path` shorthand gets `https://` prepended before parsing.
/// The result must be an absolute http(s) URL; anything else is rejected
/// here, before any network I/O happens.
pub fn normalize_source_url(raw: &str) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    let candidate: Cow<'_, str> = if trimmed.contains("://") {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("https://{trimmed}"))
    };

    let url = Url::parse(&candidate)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_owned())),
    }
}
