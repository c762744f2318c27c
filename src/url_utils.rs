use url::Url;

/// Parses an http(s) URL, tolerating surrounding whitespace.
///
/// Other schemes (`about:`, `data:`, `blob:` ...) are rejected.
pub fn parse_http_url(input: &str) -> Option<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let url = Url::parse(trimmed).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// Lower-cased host of an http(s) URL.
pub fn host_of(input: &str) -> Option<String> {
    let url = parse_http_url(input)?;
    url.host_str().map(|h| h.to_ascii_lowercase())
}

/// Drops the `www.` / `m.` prefixes sites use for the same content.
///
/// Example: `m.example.com` -> `example.com`
pub fn strip_host_prefix(host: &str) -> &str {
    let mut host = host;
    for prefix in ["www.", "m."] {
        if let Some(rest) = host.strip_prefix(prefix) {
            // Keep "m.com" rather than reducing it to "com".
            if rest.contains('.') {
                host = rest;
            }
        }
    }
    host
}

/// Host used for block-list and supported-page lookups.
pub fn lookup_host(input: &str) -> Option<String> {
    let host = host_of(input)?;
    let stripped = strip_host_prefix(&host);
    if stripped.is_empty() {
        None
    } else {
        Some(stripped.to_string())
    }
}
