//! URL utilities for consistent URL handling
//!
//! Hosts come from a flag, the config file, or `OLLAMA_HOST`, so they are
//! normalized before any endpoint path is appended.

use reqwest::Url;

use crate::core::constants::DEFAULT_PORT;

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use ollachat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:11434"), "http://localhost:11434");
/// assert_eq!(normalize_base_url("http://localhost:11434///"), "http://localhost:11434");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Normalize a user-entered Ollama host
///
/// Surrounding whitespace and trailing slashes are removed. A host given
/// without a scheme (as `OLLAMA_HOST` commonly is) gets `http://`, plus
/// Ollama's port when it names none. A host with an explicit scheme keeps
/// that scheme's default port.
///
/// # Examples
///
/// ```
/// use ollachat::utils::url::normalize_host;
///
/// assert_eq!(normalize_host(" localhost:11434/ "), "http://localhost:11434");
/// assert_eq!(normalize_host("gpu-box"), "http://gpu-box:11434");
/// assert_eq!(normalize_host("https://gpu-box"), "https://gpu-box");
/// ```
pub fn normalize_host(host: &str) -> String {
    let trimmed = normalize_base_url(host.trim());
    if trimmed.is_empty() || trimmed.contains("://") {
        return trimmed;
    }

    let with_scheme = format!("http://{trimmed}");
    if has_explicit_port(&trimmed) {
        return with_scheme;
    }
    match Url::parse(&with_scheme) {
        Ok(mut url) => {
            if url.set_port(Some(DEFAULT_PORT)).is_ok() {
                normalize_base_url(url.as_str())
            } else {
                with_scheme
            }
        }
        _ => with_scheme,
    }
}

/// `Url::port` reports `None` for a scheme's default port, so look at the
/// authority text itself.
fn has_explicit_port(host_without_scheme: &str) -> bool {
    let authority = host_without_scheme.split('/').next().unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or(authority);
    match authority.rfind(']') {
        Some(end) => authority[end..].contains(':'),
        None => authority.contains(':'),
    }
}

/// Construct a complete API endpoint URL from a base URL and endpoint path
///
/// # Examples
///
/// ```
/// use ollachat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:11434/", "/api/chat"),
///     "http://localhost:11434/api/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}
