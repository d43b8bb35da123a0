use url::Url;

/// Last non-empty path segment of a URL or path, query and fragment excluded.
pub fn trailing_segment(link: &str) -> Option<&str> {
    let end = link.find(['?', '#']).unwrap_or(link.len());
    link[..end]
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

/// Resolve a possibly relative `href` against the site origin.
pub fn absolutize(base: &Url, href: &str) -> Option<Url> {
    base.join(href).ok()
}

/// Extension of the last path segment, if it has one.
pub fn file_extension(url: &str) -> Option<&str> {
    let segment = trailing_segment(url)?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

/// `<prefix>_<identifier>.<ext>`, the name given to metadata-resolved assets.
pub fn api_file_name(prefix: &str, identifier: &str, source_url: &str, fallback_ext: &str) -> String {
    let ext = file_extension(source_url).unwrap_or(fallback_ext);
    sanitize_filename(&format!("{}_{}.{}", prefix, identifier, ext))
}

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_segment() {
        assert_eq!(trailing_segment("https://www.zerochan.net/123456"), Some("123456"));
        assert_eq!(trailing_segment("/123456?json"), Some("123456"));
        assert_eq!(trailing_segment("https://www.zerochan.net/"), None);
        assert_eq!(trailing_segment(""), None);
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("https://cdn.example/123456.full.jpg"), Some("jpg"));
        assert_eq!(file_extension("https://cdn.example/a.png?x=1"), Some("png"));
        assert_eq!(file_extension("https://cdn.example/noext"), None);
        assert_eq!(file_extension("https://cdn.example/.hidden"), None);
    }

    #[test]
    fn test_api_file_name() {
        assert_eq!(
            api_file_name("site", "123456", "https://cdn.example/123456.full.jpg", "jpg"),
            "site_123456.jpg"
        );
        assert_eq!(
            api_file_name("zerochan", "7", "https://cdn.example/7", "jpg"),
            "zerochan_7.jpg"
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("test/file.jpg"), "test_file.jpg");
        assert_eq!(sanitize_filename("normal-name.png"), "normal-name.png");
    }
}
