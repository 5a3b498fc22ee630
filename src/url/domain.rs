use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use geo_harvest::url::extract_domain;
///
/// let url = Url::parse("http://WWW.WorldCitiesDB.com/country/list").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.worldcitiesdb.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Splits an allowed host into its name and optional explicit port
fn split_port(allowed_host: &str) -> (&str, Option<u16>) {
    match allowed_host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() && !name.ends_with(':') => {
            match port.parse::<u16>() {
                Ok(port) => (name, Some(port)),
                Err(_) => (allowed_host, None),
            }
        }
        _ => (allowed_host, None),
    }
}

/// Returns true if the URL lives on the allowed host
///
/// `allowed_host` is a host name with an optional `:port`. Without a port
/// only the scheme's default port is accepted, so `host:8080` is a
/// different origin from `host`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use geo_harvest::url::is_allowed_host;
///
/// let url = Url::parse("http://127.0.0.1:8080/country/list").unwrap();
/// assert!(is_allowed_host(&url, "127.0.0.1:8080"));
/// assert!(!is_allowed_host(&url, "127.0.0.1"));
/// ```
pub fn is_allowed_host(url: &Url, allowed_host: &str) -> bool {
    let Some(host) = extract_domain(url) else {
        return false;
    };
    let (name, port) = split_port(allowed_host);

    if !host.eq_ignore_ascii_case(name) {
        return false;
    }

    match port {
        Some(port) => url.port_or_known_default() == Some(port),
        None => url.port().is_none(),
    }
}
