//! URL handling module for Geo-Harvest
//!
//! Discovered links are relative paths on the harvested site. This module
//! resolves them against the page they were found on and keeps the crawl
//! on the configured host.

mod domain;

use crate::{UrlError, UrlResult};
use url::Url;

pub use domain::{extract_domain, is_allowed_host};

/// Resolves a discovered `href` to an absolute URL on the allowed host
///
/// # Arguments
///
/// * `href` - The raw attribute value
/// * `base_url` - The URL of the page the link was found on
/// * `allowed_host` - The only host the crawl may visit
///
/// # Returns
///
/// * `Ok(Url)` - Absolute http(s) URL on the allowed host
/// * `Err(UrlError)` - Empty, unresolvable, non-http or off-origin link
///
/// # Examples
///
/// ```
/// use url::Url;
/// use geo_harvest::url::resolve_link;
///
/// let base = Url::parse("http://www.worldcitiesdb.com/country/list").unwrap();
/// let url = resolve_link("/country/FR", &base, "www.worldcitiesdb.com").unwrap();
/// assert_eq!(url.as_str(), "http://www.worldcitiesdb.com/country/FR");
/// ```
pub fn resolve_link(href: &str, base_url: &Url, allowed_host: &str) -> UrlResult<Url> {
    let href = href.trim();

    if href.is_empty() {
        return Err(UrlError::Empty);
    }

    let absolute = base_url.join(href).map_err(|e| UrlError::Resolve {
        href: href.to_string(),
        message: e.to_string(),
    })?;

    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return Err(UrlError::InvalidScheme(absolute.scheme().to_string()));
    }

    if !is_allowed_host(&absolute, allowed_host) {
        return Err(UrlError::OffOrigin {
            url: absolute.to_string(),
            allowed: allowed_host.to_string(),
        });
    }

    Ok(absolute)
}
