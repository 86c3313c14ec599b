use crate::constants::{MAX_GOAL_TEXT_LEN, MAX_HOSTNAME_LEN};
use crate::error::AppError;
use crate::hostname::resolve_hostname;
use crate::models::goal::parse_deadline;

/// Validate a hostname supplied by the UI. Returns it trimmed and lowercased.
pub fn validate_hostname(hostname: &str) -> Result<String, AppError> {
    let hostname = hostname.trim().to_ascii_lowercase();
    if hostname.is_empty() {
        return Err(AppError::InvalidInput {
            field: "hostname",
            reason: "cannot be empty".into(),
        });
    }
    if hostname.len() > MAX_HOSTNAME_LEN {
        return Err(AppError::InvalidInput {
            field: "hostname",
            reason: format!("cannot exceed {MAX_HOSTNAME_LEN} characters"),
        });
    }
    // Colons only appear inside a bracketed IPv6 literal, never as a port
    let (body, allowed): (&str, fn(char) -> bool) =
        match hostname.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            Some(ipv6) => (ipv6, is_ipv6_char),
            None => (hostname.as_str(), is_hostname_char),
        };
    if body.is_empty() {
        return Err(AppError::InvalidInput {
            field: "hostname",
            reason: "cannot be empty".into(),
        });
    }
    if let Some(bad) = body.chars().find(|c| !allowed(*c)) {
        return Err(AppError::InvalidInput {
            field: "hostname",
            reason: format!("unexpected character '{bad}'"),
        });
    }
    Ok(hostname)
}

fn is_ipv6_char(c: char) -> bool {
    c.is_ascii_hexdigit() || matches!(c, ':' | '.')
}

fn is_hostname_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

/// Resolve a site typed by the user. Accepts full URLs and, as a
/// convenience, bare hostnames such as `example.com`.
pub fn validate_site_input(input: &str) -> Result<String, AppError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::InvalidInput {
            field: "url",
            reason: "cannot be empty".into(),
        });
    }
    let hostname = resolve_hostname(input)
        .or_else(|| {
            if input.contains("://") {
                None
            } else {
                resolve_hostname(&format!("https://{input}"))
            }
        })
        .ok_or_else(|| AppError::InvalidInput {
            field: "url",
            reason: "must be a valid http(s) URL".into(),
        })?;
    validate_hostname(&hostname)
}

/// Validate goal text.
pub fn validate_goal_text(text: &str) -> Result<&str, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidInput {
            field: "text",
            reason: "cannot be empty".into(),
        });
    }
    if text.chars().count() > MAX_GOAL_TEXT_LEN {
        return Err(AppError::InvalidInput {
            field: "text",
            reason: format!("cannot exceed {MAX_GOAL_TEXT_LEN} characters"),
        });
    }
    Ok(text)
}

/// Validate an optional goal deadline. Empty strings mean "no deadline".
pub fn validate_deadline(deadline: Option<&str>) -> Result<Option<&str>, AppError> {
    let Some(raw) = deadline.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if parse_deadline(raw).is_none() {
        return Err(AppError::InvalidInput {
            field: "deadline",
            reason: "must be an ISO 8601 date and time".into(),
        });
    }
    Ok(Some(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_hostname() {
        assert_eq!(validate_hostname("  Example.COM ").unwrap(), "example.com");
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("exa mple.com").is_err());
        assert!(validate_hostname("example.com/path").is_err());
        assert!(validate_hostname(&"a".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_hostname_rejects_ports() {
        assert!(validate_hostname("example.com:8080").is_err());
        assert!(validate_hostname("[::1]:80").is_err());
        assert!(validate_hostname("[]").is_err());
        assert!(validate_hostname("exa[mple.com").is_err());
        assert_eq!(validate_hostname("[::1]").unwrap(), "[::1]");
        assert_eq!(validate_site_input("http://example.com:8080/").unwrap(), "example.com");
    }

    #[test]
    fn test_validate_site_input_accepts_urls_and_hosts() {
        assert_eq!(validate_site_input("https://news.ycombinator.com/item?id=1").unwrap(), "news.ycombinator.com");
        assert_eq!(validate_site_input("example.com").unwrap(), "example.com");
        assert!(validate_site_input("   ").is_err());
        assert!(validate_site_input("ftp://example.com").is_err());
        assert!(validate_site_input("chrome://settings").is_err());
    }

    #[test]
    fn test_validate_goal_text() {
        assert_eq!(validate_goal_text("  Finish report ").unwrap(), "Finish report");
        assert!(validate_goal_text("").is_err());
        assert!(validate_goal_text(&"x".repeat(MAX_GOAL_TEXT_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_deadline() {
        assert_eq!(validate_deadline(None).unwrap(), None);
        assert_eq!(validate_deadline(Some("  ")).unwrap(), None);
        assert_eq!(validate_deadline(Some("2030-01-01T09:00")).unwrap(), Some("2030-01-01T09:00"));
        assert!(validate_deadline(Some("next week")).is_err());
    }
}
