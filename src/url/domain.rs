/// Maximum length of a full domain name
const MAX_DOMAIN_LEN: usize = 253;

/// Maximum length of a single label
const MAX_LABEL_LEN: usize = 63;

/// Checks whether a string is a syntactically valid domain name
///
/// Only a bare domain is accepted: no scheme, no path, no port and no
/// user info. The name must have at least two labels and an alphabetic
/// top-level label, so IP addresses and single-label hosts are rejected.
///
/// # Examples
///
/// ```
/// use mannerly::url::is_valid_domain;
///
/// assert!(is_valid_domain("pleiades.stoa.org"));
/// assert!(!is_valid_domain("pleiades"));
/// assert!(!is_valid_domain("https://pleiades.stoa.org"));
/// ```
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    if !labels.iter().all(|label| is_valid_label(label)) {
        return false;
    }

    // Top-level label must be alphabetic (rules out dotted-quad addresses)
    labels
        .last()
        .map(|tld| tld.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false)
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return false;
    }

    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }

    label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Derives the cache partition name for a netloc
///
/// Dots are replaced with underscores, so repeated construction against the
/// same netloc always lands in the same partition.
///
/// ```
/// use mannerly::url::cache_partition_name;
///
/// assert_eq!(cache_partition_name("pleiades.stoa.org"), "pleiades_stoa_org");
/// ```
pub fn cache_partition_name(netloc: &str) -> String {
    netloc.replace('.', "_")
}
