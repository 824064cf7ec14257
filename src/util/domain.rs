//! Registrable-domain comparison for same-site checks.
//!
//! "Same domain" throughout the crate means the registrable domain, so
//! `blog.example.com` and `www.example.com` are the same site, and
//! `news.example.co.uk` registers as `example.co.uk`.

use url::{Host, Url};

/// Extracts the registrable domain of a URL's host.
///
/// Compact-suffix heuristic: hosts with two or fewer labels are returned
/// whole; when the last two labels are both three characters or shorter
/// (`co.uk`, `com.br`, `net.au`), the last three labels form the registrable
/// domain; otherwise the last two do. IP-literal hosts are returned verbatim,
/// so every distinct address is its own "domain".
///
/// Returns `None` for URLs without a host (e.g. `data:` URLs).
pub fn registrable_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
        Host::Domain(host) => {
            let parts: Vec<&str> = host.split('.').collect();
            let n = parts.len();
            if n <= 2 {
                return Some(host.to_owned());
            }
            // co.uk / com.br style compound suffixes
            let take = if parts[n - 2].len() <= 3 && parts[n - 1].len() <= 3 {
                3
            } else {
                2
            };
            Some(parts[n - take..].join("."))
        }
    }
}

/// Whether two URLs belong to the same registrable domain.
///
/// False when either URL has no host.
pub fn same_registrable_domain(a: &Url, b: &Url) -> bool {
    match (registrable_domain(a), registrable_domain(b)) {
        (Some(da), Some(db)) => da == db,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain_of(url: &str) -> Option<String> {
        registrable_domain(&Url::parse(url).unwrap())
    }

    #[test]
    fn bare_domain_returned_whole() {
        assert_eq!(domain_of("https://example.com/a/b").as_deref(), Some("example.com"));
    }

    #[test]
    fn subdomain_is_stripped() {
        assert_eq!(domain_of("https://www.example.com").as_deref(), Some("example.com"));
        assert_eq!(domain_of("https://a.b.example.com").as_deref(), Some("example.com"));
    }

    #[test]
    fn compound_suffix_keeps_three_labels() {
        assert_eq!(
            domain_of("https://news.example.co.uk").as_deref(),
            Some("example.co.uk")
        );
        assert_eq!(
            domain_of("https://shop.example.com.br").as_deref(),
            Some("example.com.br")
        );
    }

    #[test]
    fn ip_hosts_compared_whole() {
        assert_eq!(domain_of("http://127.0.0.1:8080/x").as_deref(), Some("127.0.0.1"));
        assert_eq!(domain_of("http://[::1]/x").as_deref(), Some("::1"));
    }

    #[test]
    fn same_domain_across_subdomains() {
        let a = Url::parse("https://blog.example.com/feed").unwrap();
        let b = Url::parse("https://example.com").unwrap();
        assert!(same_registrable_domain(&a, &b));
    }

    #[test]
    fn different_domains_are_foreign() {
        let a = Url::parse("https://example.com").unwrap();
        let b = Url::parse("https://example.org").unwrap();
        assert!(!same_registrable_domain(&a, &b));
    }

    #[test]
    fn same_ip_different_port_is_same_domain() {
        let a = Url::parse("http://127.0.0.1:1234/").unwrap();
        let b = Url::parse("http://127.0.0.1:5678/").unwrap();
        assert!(same_registrable_domain(&a, &b));
    }
}
