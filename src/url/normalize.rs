use crate::UrlError;
use url::Url;

/// Scheme assumed for bare host names
const DEFAULT_SCHEME: &str = "http://";

/// Normalizes a raw host or URL into a crawl origin
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Prefix `http://` when the input carries no `//` (bare host names)
/// 3. Parse the URL; reject if malformed
/// 4. Require an HTTP or HTTPS scheme and a host
/// 5. Lowercase the host (done by the parser)
/// 6. Remove the fragment
/// 7. Remove trailing slashes, so `<origin>/robots.txt` is well-formed
///
/// # Examples
///
/// ```
/// use warc_harvest::url::normalize_origin;
///
/// assert_eq!(normalize_origin("Example.COM").unwrap(), "http://example.com");
/// assert_eq!(normalize_origin("https://example.com/docs/").unwrap(), "https://example.com/docs");
/// ```
pub fn normalize_origin(raw: &str) -> Result<String, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty origin".to_string()));
    }

    let candidate = if trimmed.contains("//") {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME, trimmed)
    };

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    Ok(trim_trailing_slash(url.as_str()))
}

/// Strips trailing `/` characters from a URL string
pub fn trim_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Builds the robots.txt location for an origin
///
/// # Examples
///
/// ```
/// use warc_harvest::url::robots_url;
///
/// assert_eq!(robots_url("http://example.com/"), "http://example.com/robots.txt");
/// ```
pub fn robots_url(origin: &str) -> String {
    format!("{}/robots.txt", origin.trim_end_matches('/'))
}
