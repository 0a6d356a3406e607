//! Deterministic URL slugs for storage paths and record identifiers.

use url::Url;

/// Derive a filesystem-safe slug from an absolute URL.
///
/// The slug is a pure function of the URL: the host's final dot-separated
/// label becomes a grouping prefix, followed by the lower-cased host, path,
/// and query with `/` collapsed to `-` and every other unsafe character
/// (notably `.`) substituted with `_`. URL variants that differ only by
/// scheme, case, or a trailing slash map to the same slug.
///
/// # Errors
///
/// Returns an error if the input is not an absolute URL with a host.
pub fn derive_slug(input: &str) -> Result<String, url::ParseError> {
    let parsed = Url::parse(input)?;
    let host = parsed.host_str().ok_or(url::ParseError::EmptyHost)?;
    let host = host.to_lowercase();

    let mut body = host.clone();
    body.push_str(parsed.path());
    if let Some(query) = parsed.query() {
        body.push('?');
        body.push_str(query);
    }

    let body: String = body
        .to_lowercase()
        .trim_matches('/')
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            '/' => '-',
            _ => '_',
        })
        .collect();

    let suffix = host.rsplit('.').next().unwrap_or(&host);
    Ok(format!("{suffix}-{body}"))
}
