//! PEP 503 simple index parsing.
//!
//! GitLab serves `/packages/pypi/simple/{name}` as an HTML page with one
//! anchor per distribution file. The anchors are the only thing the mirror
//! pipeline needs from it.

use scraper::{Html, Selector};
use url::Url;

/// Extract every anchor `href` from an HTML document, in document order.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve hrefs against the index URL and drop `#sha256=...` fragments.
///
/// Hrefs that cannot be resolved are skipped with a warning.
pub fn resolve_file_urls(index_url: &str, hrefs: &[String]) -> Vec<String> {
    let base = match Url::parse(index_url) {
        Ok(base) => base,
        Err(e) => {
            tracing::warn!(index_url, error = %e, "Invalid simple index URL");
            return Vec::new();
        }
    };

    hrefs
        .iter()
        .filter_map(|href| match base.join(href) {
            Ok(mut url) => {
                url.set_fragment(None);
                Some(url.to_string())
            }
            Err(e) => {
                tracing::warn!(href = %href, error = %e, "Skipping unresolvable href");
                None
            }
        })
        .collect()
}

/// Extract the filename from a `Content-Disposition` header value.
///
/// Accepts `filename="..."`, bare `filename=...` and the RFC 6266
/// `filename*=UTF-8''...` form, preferring the latter when both are present.
pub fn content_disposition_filename(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for part in value.split(';').map(str::trim) {
        let Some((key, raw)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename" => {
                let name = raw.trim().trim_matches('"');
                if !name.is_empty() {
                    plain = Some(name.to_string());
                }
            }
            "filename*" => {
                let raw = raw.trim().trim_matches('"');
                let encoded = raw.rsplit_once('\'').map_or(raw, |(_, rest)| rest);
                if let Ok(decoded) = urlencoding::decode(encoded)
                    && !decoded.is_empty()
                {
                    extended = Some(decoded.into_owned());
                }
            }
            _ => {}
        }
    }

    extended.or(plain).and_then(|name| sanitize_filename(&name))
}

/// Keep only the final path component so a hostile header cannot escape the
/// working directory.
fn sanitize_filename(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}
