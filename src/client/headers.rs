//! Header construction, merging and User-Agent extraction
//!
//! Headers are always held in a [`HeaderMap`], whose keys compare
//! case-insensitively, so `User-Agent` and `user-agent` are the same entry.

use crate::robots::normalize_space;
use crate::{ConfigError, ConfigResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

/// User-Agent sent when the caller does not supply one
pub const DEFAULT_USER_AGENT: &str = concat!("Mannerly/", env!("CARGO_PKG_VERSION"));

/// Returns a fresh copy of the default headers
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers
}

/// Builds a header map from name/value string pairs
///
/// # Errors
///
/// Returns [`ConfigError::InvalidHeader`] if a name is not a valid header
/// token or a value contains characters not allowed in headers.
pub fn headers_from_pairs<I, K, V>(pairs: I) -> ConfigResult<HeaderMap>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = name.as_ref();
        let value = value.as_ref();
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(format!("invalid header name '{}'", name)))?;
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            ConfigError::InvalidHeader(format!("invalid value for header '{}'", name))
        })?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

/// Overlays `overlay` onto a copy of `base`
///
/// Every header named in the overlay replaces all of base's values for that
/// name.
pub fn merge_headers(base: &HeaderMap, overlay: &HeaderMap) -> HeaderMap {
    let mut merged = base.clone();
    for name in overlay.keys() {
        merged.remove(name);
        for value in overlay.get_all(name) {
            merged.append(name.clone(), value.clone());
        }
    }
    merged
}

/// Extracts the User-Agent value with whitespace normalized
///
/// # Errors
///
/// * [`ConfigError::MissingUserAgent`] - no User-Agent header
/// * [`ConfigError::BlankUserAgent`] - present but empty or whitespace
/// * [`ConfigError::InvalidHeader`] - not valid visible ASCII
pub fn extract_user_agent(headers: &HeaderMap) -> ConfigResult<String> {
    let value = headers.get(USER_AGENT).ok_or(ConfigError::MissingUserAgent)?;
    let value = value
        .to_str()
        .map_err(|_| ConfigError::InvalidHeader("User-Agent is not valid ASCII".to_string()))?;

    let user_agent = normalize_space(value);
    if user_agent.is_empty() {
        return Err(ConfigError::BlankUserAgent);
    }
    Ok(user_agent)
}
