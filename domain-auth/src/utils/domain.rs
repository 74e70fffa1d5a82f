//! Syntactic checks for domain names and DKIM selectors

/// Maximum length of a domain name in presentation format
pub const MAX_DOMAIN_LEN: usize = 253;

/// Maximum length of a single DNS label
pub const MAX_LABEL_LEN: usize = 63;

/// Check that `domain` is a syntactically valid host name with at least two labels.
///
/// Pure function: no I/O. Rejects empty input, leading/trailing dots, empty
/// labels, characters outside `[a-zA-Z0-9-]`, labels starting or ending with
/// `-`, and names over the DNS length limits.
pub fn validate_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    labels.iter().all(|label| is_valid_label(label))
}

/// Check a DKIM selector.
///
/// A selector is one or more dot-separated labels (RFC 6376 allows
/// `s=june2005.eng`). Underscores are tolerated since several providers issue
/// selectors like `s1_2024`.
pub fn validate_selector(selector: &str) -> bool {
    if selector.is_empty() || selector.len() > MAX_DOMAIN_LEN {
        return false;
    }

    selector.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
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
