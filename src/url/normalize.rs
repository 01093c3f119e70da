use crate::UrlError;
use url::Url;

/// Normalizes a configured forum host into the prefix every link is built from
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an HTTP or HTTPS scheme
/// 3. Reject query strings and fragments
/// 4. Lowercase the host (the `url` crate does this while parsing)
/// 5. Drop any trailing slash, so `format!("{host}/index.php")` is well formed
///
/// # Examples
///
/// ```
/// use forum_harvest::url::normalize_host;
///
/// let host = normalize_host("https://Forum.Example.com/").unwrap();
/// assert_eq!(host, "https://forum.example.com");
/// ```
pub fn normalize_host(host: &str) -> Result<String, UrlError> {
    let url = Url::parse(host.trim()).map_err(|e| UrlError::InvalidHost(format!("{host}: {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidHost(format!(
            "only HTTP and HTTPS are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::InvalidHost(format!("{host}: missing host")));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlError::InvalidHost(format!(
            "{host}: query strings and fragments are not allowed"
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Resolves an href found on a page against the forum host
///
/// Returns None for empty hrefs, fragment-only anchors, `javascript:` links
/// and anything that does not resolve to HTTP(S).
pub fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}

/// Builds the base URL relative hrefs are joined against
pub fn host_base(host: &str) -> Result<Url, UrlError> {
    Url::parse(&format!("{host}/")).map_err(|e| UrlError::InvalidHost(format!("{host}: {e}")))
}
