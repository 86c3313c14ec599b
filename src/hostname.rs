use url::Url;

/// Resolve the hostname of a web URL.
///
/// Only `http` and `https` URLs count as sites. Internal pages
/// (`chrome://`, `about:`, extension pages) and anything unparsable
/// resolve to `None`.
pub fn resolve_hostname(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" => {}
        _ => return None,
    }
    let host = url.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_hostname() {
        assert_eq!(resolve_hostname("https://www.reddit.com/r/rust"), Some("www.reddit.com".into()));
        assert_eq!(resolve_hostname("http://github.com"), Some("github.com".into()));
        assert_eq!(resolve_hostname("https://docs.rs/tokio/latest"), Some("docs.rs".into()));
    }

    #[test]
    fn test_resolve_hostname_lowercases() {
        assert_eq!(resolve_hostname("https://Example.COM/Path"), Some("example.com".into()));
    }

    #[test]
    fn test_resolve_hostname_keeps_no_port() {
        assert_eq!(resolve_hostname("http://localhost:8080/"), Some("localhost".into()));
    }

    #[test]
    fn test_internal_pages_are_ignored() {
        assert_eq!(resolve_hostname("chrome://extensions"), None);
        assert_eq!(resolve_hostname("about:blank"), None);
        assert_eq!(resolve_hostname("chrome-extension://abcdef/blocked.html"), None);
        assert_eq!(resolve_hostname("file:///home/user/notes.txt"), None);
    }

    #[test]
    fn test_malformed_urls_are_ignored() {
        assert_eq!(resolve_hostname(""), None);
        assert_eq!(resolve_hostname("not a url"), None);
        assert_eq!(resolve_hostname("example.com"), None);
    }
}
