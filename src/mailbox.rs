//! Mailbox-address syntax checks used by the mail template validation.

use std::sync::LazyLock;

use regex::Regex;

static ESCAPED_QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\\["']"#).unwrap());
static QUOTED_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).unwrap());
static ANGLE_ADDR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<(.+)>$").unwrap());

const LOCAL_PART_SPECIALS: &str = "!#$%&'*+/=?^_`{|}~.-";

/// Address check with the same acceptance rules as the WordPress core.
pub fn is_email(addr: &str) -> bool {
    if addr.len() < 6 {
        return false;
    }

    let Some((local, domain)) = addr.split_once('@') else {
        return false;
    };

    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || LOCAL_PART_SPECIALS.contains(c))
    {
        return false;
    }

    if domain.contains("..") {
        return false;
    }
    if domain.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0' || c == '\x0B' || c == '.')
        != domain
    {
        return false;
    }

    let subs: Vec<&str> = domain.split('.').collect();
    if subs.len() < 2 {
        return false;
    }

    subs.iter().all(|sub| {
        !sub.is_empty()
            && !sub.starts_with('-')
            && !sub.ends_with('-')
            && sub.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Parse a comma-separated list of `addr` or `Display Name <addr>` entries.
///
/// Returns the bare addresses, or `None` when any entry is not a valid
/// mailbox. Quoted display names may contain commas.
pub fn is_mailbox_list(text: &str) -> Option<Vec<String>> {
    let text = ESCAPED_QUOTE.replace_all(text, "esc-quote");
    let text = QUOTED_STRING.replace_all(&text, "quoted-string");

    let mut addresses = Vec::new();
    for mailbox in text.split(',') {
        let mailbox = mailbox.trim();
        let addr_spec = ANGLE_ADDR
            .captures(mailbox)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(mailbox);

        if !is_email(addr_spec) {
            return None;
        }
        addresses.push(addr_spec.to_string());
    }

    Some(addresses)
}

/// Case-folded host name without a trailing dot.
fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// True when every address of the list belongs to `domain` or to one of
/// its parent domains (down to two labels).
pub fn is_email_in_domain(text: &str, domain: &str) -> bool {
    let Some(addresses) = is_mailbox_list(text) else {
        return false;
    };
    let domain = normalize_domain(domain);

    addresses.iter().all(|addr| {
        let email_domain = addr
            .rsplit_once('@')
            .map(|(_, d)| normalize_domain(d))
            .unwrap_or_default();

        let mut candidate = domain.as_str();
        loop {
            if candidate == email_domain {
                return true;
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return false,
            }
        }
    })
}

fn is_localhost(site_domain: &str) -> bool {
    matches!(site_domain, "localhost" | "127.0.0.1" | "::1")
}

/// Whether the sender addresses match the site's own host.
///
/// Local and bare-IP sites accept any sender.
pub fn is_email_in_site_domain(text: &str, site_domain: &str) -> bool {
    let site = normalize_domain(site_domain);

    if is_localhost(&site) {
        return true;
    }
    if !site.is_empty() && site.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return true;
    }

    is_email_in_domain(text, &site)
}

/// Remove carriage returns and line feeds, then trim.
pub fn strip_newline(text: &str) -> String {
    text.replace(['\r', '\n'], "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_email("example@example.com"));
        assert!(is_email("first.last+tag@mail.example.org"));
    }

    #[test]
    fn rejects_bad_addresses() {
        assert!(!is_email("a@b.c"));
        assert!(!is_email("no-at-sign.example.com"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("user@localhost"));
        assert!(!is_email("user@exa..mple.com"));
        assert!(!is_email("user@-example.com"));
        assert!(!is_email("user@.example.com"));
        assert!(!is_email("us er@example.com"));
        assert!(!is_email("user@exam_ple.com"));
    }

    #[test]
    fn mailbox_lists() {
        let list = is_mailbox_list("Site <wordpress@example.com>, other@example.org").unwrap();
        assert_eq!(list, vec!["wordpress@example.com", "other@example.org"]);

        assert!(is_mailbox_list(r#""Doe, John" <john@example.com>"#).is_some());
        assert!(is_mailbox_list("").is_none());
        assert!(is_mailbox_list("example").is_none());
        assert!(is_mailbox_list("a@example.com,").is_none());
    }

    #[test]
    fn site_domain_matching() {
        assert!(is_email_in_site_domain("wordpress@example.com", "example.com"));
        assert!(is_email_in_site_domain("wordpress@EXAMPLE.com", "Example.COM."));
        assert!(is_email_in_site_domain("wordpress@example.com", "www.example.com"));
        assert!(!is_email_in_site_domain("wordpress@example.com", "example.org"));
        assert!(!is_email_in_site_domain("someone@gmail.com", "www.example.com"));
        assert!(!is_email_in_site_domain("a@com.com", "shop.example.com"));
    }

    #[test]
    fn local_sites_accept_everything() {
        assert!(is_email_in_site_domain("someone@gmail.com", "localhost"));
        assert!(is_email_in_site_domain("someone@gmail.com", "192.168.0.10"));
    }

    #[test]
    fn newlines_are_stripped() {
        assert_eq!(strip_newline(" Hello\r\n world \n"), "Hello world");
    }
}
