use url::Url;

/// Lower-cased host of an http(s) URL. Bare domains such as
/// `youtube.com/watch` are accepted. Anything else yields `None`.
pub fn host_of(input: &str) -> Option<String> {
    let parsed = parse_web_url(input)?;
    let host = parsed.host_str()?.trim_end_matches('.');
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

/// Form stored in the domain map: lower-cased, no trailing dot, no `www.`.
pub fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    match lowered.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => lowered,
    }
}

/// Last two labels of a host with more than two. Same naive cut as the
/// classifier's parent fallback, so `co.uk` style suffixes are misread.
pub fn parent_domain(domain: &str) -> Option<String> {
    let labels: Vec<&str> = domain.split('.').collect();
    (labels.len() > 2).then(|| labels[labels.len() - 2..].join("."))
}

/// Path tokens longer than two characters, split on `/`, `-` and `_`.
/// Secondary signal for the content classifier only.
pub fn extract_path_keywords(input: &str) -> Vec<String> {
    let Some(parsed) = parse_web_url(input) else {
        return Vec::new();
    };

    parsed
        .path()
        .split('/')
        .flat_map(|segment| segment.split(&['-', '_'][..]))
        .filter(|token| token.chars().count() > 2)
        .map(|token| token.to_lowercase())
        .collect()
}

fn parse_web_url(input: &str) -> Option<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{trimmed}")).ok()?
        }
        Err(_) => return None,
    };

    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}
