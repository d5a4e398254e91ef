use thiserror::Error;
use url::Url;

/// Errors produced while checking an address typed into the reader or
/// taken from an article's source link.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    #[error("URL has no host")]
    MissingHost,
}

/// Turn whatever the user typed into the address bar into a fetchable
/// address. Anything not already starting with `http` gets `https://`.
///
/// ```
/// use newsdesk::util::normalize_address;
///
/// assert_eq!(normalize_address("  news.example.com "), "https://news.example.com");
/// assert_eq!(normalize_address("http://a.example"), "http://a.example");
/// ```
pub fn normalize_address(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    }
}

/// Validate an address before handing it to the system browser.
///
/// Only web schemes are allowed so a crafted `source_url` cannot launch
/// `file:` or custom protocol handlers.
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::UnsupportedScheme(other.to_owned())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }
    Ok(url)
}
