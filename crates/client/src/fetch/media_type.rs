//! Media type resolution for fetched resources.
//!
//! Some servers omit `Content-Type`, but the renderer needs one to interpret
//! the bytes. When it is missing the type is inferred from the extension of
//! the URL path.

/// Media type used when nothing better is known.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Encoding assumed when the server does not declare a charset.
pub const DEFAULT_ENCODING: &str = "UTF-8";

const EXTENSION_TABLE: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("js", "application/javascript"),
    ("css", "text/css"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("heic", "image/heic"),
    ("webp", "image/webp"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("pdf", "application/pdf"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
];

/// A parsed `Content-Type` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Lowercased `type/subtype` with parameters stripped.
    pub essence: String,
    pub charset: Option<String>,
}

/// Parse a `Content-Type` header value.
///
/// Returns `None` when the essence is empty.
pub fn parse_content_type(value: &str) -> Option<ContentType> {
    let mut parts = value.split(';');
    let essence = parts.next().unwrap_or("").trim().to_ascii_lowercase();
    if essence.is_empty() {
        return None;
    }

    let charset = parts.find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    });

    Some(ContentType { essence, charset })
}

/// Infer a media type from the extension of the URL path.
///
/// Query strings and fragments are ignored. Unknown or missing extensions
/// yield [`FALLBACK_MEDIA_TYPE`].
pub fn media_type_for_url(url: &str) -> &'static str {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or("").to_string(),
    };

    let Some(file_name) = path.rsplit('/').next() else {
        return FALLBACK_MEDIA_TYPE;
    };
    let Some((_, extension)) = file_name.rsplit_once('.') else {
        return FALLBACK_MEDIA_TYPE;
    };

    EXTENSION_TABLE
        .iter()
        .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
        .map(|(_, media_type)| *media_type)
        .unwrap_or(FALLBACK_MEDIA_TYPE)
}

/// Resolve media type and encoding from the declared header and the URL.
pub fn resolve(declared: Option<&str>, url: &str) -> (String, String) {
    match declared.and_then(parse_content_type) {
        Some(ContentType { essence, charset }) => (essence, charset.unwrap_or_else(|| DEFAULT_ENCODING.to_string())),
        None => (media_type_for_url(url).to_string(), DEFAULT_ENCODING.to_string()),
    }
}
