use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use futures::StreamExt;
use thiserror::Error;

/// Default bound on one outbound document fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default cap on a fetched document body.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024; // 10MB

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout. One attempt only; there is
    /// no retry policy.
    #[error("request timed out")]
    Timeout,
    /// Response body exceeded the configured size cap
    #[error("response too large")]
    TooLarge,
}

/// What kind of document a fetch yielded, deciding which source adapter
/// applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Xml,
    Html,
}

#[derive(Debug)]
pub struct FetchedDocument {
    pub kind: DocumentKind,
    pub body: String,
}

/// Per-fetch limits, normally filled from config.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            timeout: DEFAULT_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            user_agent: concat!("refeed/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP client used for all document fetches. The client-level timeout
/// spans the whole request, body read included; without it a server that
/// sends headers and then stalls would hang the stream forever.
pub fn build_client(options: &FetchOptions) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(&options.user_agent)
        .connect_timeout(options.timeout)
        .timeout(options.timeout)
        .build()?;
    Ok(client)
}

/// Fetch one source document, bounded by the configured timeout and body
/// size cap, and classify it as XML or HTML.
pub async fn fetch_document(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
) -> Result<FetchedDocument, FetchError> {
    let response = tokio::time::timeout(options.timeout, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(classify_error)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();

    let bytes = read_limited_bytes(response, options.max_body_bytes).await?;
    let body = decode_body(&content_type, &bytes);
    let kind = detect_kind(&content_type, &body);

    tracing::debug!(url = %url, ?kind, bytes = bytes.len(), "fetched document");
    Ok(FetchedDocument { kind, body })
}

/// Decode the raw body using its declared charset: the Content-Type
/// parameter wins, then an XML encoding declaration, then UTF-8.
/// Malformed sequences become replacement characters.
fn decode_body(content_type: &str, bytes: &[u8]) -> String {
    let encoding = charset_label(content_type)
        .or_else(|| xml_declared_charset(bytes))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Pull the charset parameter out of a lowercased Content-Type value.
fn charset_label(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("charset="))
        .map(|value| value.trim_matches('"'))
        .next()
}

/// Read the `encoding` attribute of an XML declaration, if the document
/// starts with one. The declaration itself is always ASCII.
fn xml_declared_charset(bytes: &[u8]) -> Option<&str> {
    let head = &bytes[..bytes.len().min(256)];
    if !head.starts_with(b"<?xml") {
        return None;
    }
    let end = head.iter().position(|&b| b == b'>')?;
    let declaration = std::str::from_utf8(&head[..end]).ok()?;
    let after = declaration.split_once("encoding=")?.1;
    let quote = after.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    after[1..].split(quote).next()
}

/// Classify by Content-Type, falling back to a body sniff when the header
/// is ambiguous or missing.
fn detect_kind(content_type: &str, body: &str) -> DocumentKind {
    let is_xml = content_type.contains("application/rss+xml")
        || content_type.contains("application/xml")
        || content_type.contains("text/xml");
    let is_html =
        content_type.contains("text/html") || content_type.contains("application/xhtml");

    if is_xml {
        return DocumentKind::Xml;
    }
    if is_html {
        return DocumentKind::Html;
    }

    let head: String = body.trim_start().chars().take(256).collect();
    let head = head.to_lowercase();
    if head.starts_with("<?xml") || head.contains("<rss") || head.contains("<channel") {
        DocumentKind::Xml
    } else {
        DocumentKind::Html
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify_error)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// A request that hits the client-level deadline surfaces from reqwest as
/// an ordinary error; report it as `Timeout`, not `Network`.
fn classify_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err)
    }
}
