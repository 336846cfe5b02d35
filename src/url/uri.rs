use url::Url;

/// Parses an absolute http(s) URL
///
/// Returns `None` for relative references, non-HTTP schemes, and URLs
/// without a host.
pub fn parse_absolute_url(uri: &str) -> Option<Url> {
    let url = Url::parse(uri).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}

/// Checks whether a string is a syntactically valid absolute URL
///
/// ```
/// use mannerly::url::is_valid_absolute_url;
///
/// assert!(is_valid_absolute_url("https://pleiades.stoa.org/places/295374"));
/// assert!(!is_valid_absolute_url("/places/295374"));
/// ```
pub fn is_valid_absolute_url(uri: &str) -> bool {
    parse_absolute_url(uri).is_some()
}

/// Extracts the path component robots.txt rules are matched against
///
/// Absolute URLs yield their path; anything that does not parse as a URL is
/// taken to already be a path.
pub fn request_path(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(url) => url.path().to_string(),
        Err(_) => uri.to_string(),
    }
}
