/// Domain hierarchy helpers: extraction, allow/deny list matching and root domains.
pub struct DomainUtils;

/// Second-level registries under a country code that behave like a TLD.
const COMPOUND_TLDS: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "ltd.uk", "plc.uk", "net.uk", "com.au",
    "net.au", "org.au", "edu.au", "gov.au", "co.nz", "org.nz", "net.nz", "co.jp", "ne.jp",
    "or.jp", "ac.jp", "com.br", "net.br", "org.br", "co.in", "net.in", "org.in", "co.za",
    "org.za", "com.mx", "com.cn", "net.cn", "org.cn", "com.tw", "com.hk", "com.sg", "com.tr",
    "com.ar", "co.kr", "or.kr", "com.my", "com.ph", "co.id", "com.ua", "co.il", "com.pl",
];

impl DomainUtils {
    /// Extract domain from email address
    pub fn extract_domain(email: &str) -> Option<String> {
        let domain = email.rsplit_once('@')?.1;
        let domain = domain.trim().trim_end_matches('>').trim();
        if domain.is_empty() {
            None
        } else {
            Some(domain.to_lowercase())
        }
    }

    /// Check if domain matches any in list (with hierarchy support)
    pub fn matches_domain_list<S: AsRef<str>>(domain: &str, domain_list: &[S]) -> bool {
        let domain_lower = domain.to_lowercase();

        domain_list.iter().any(|pattern| {
            let pattern_lower = pattern.as_ref().to_lowercase();
            domain_lower == pattern_lower || domain_lower.ends_with(&format!(".{}", pattern_lower))
        })
    }

    /// Canonicalize domain (remove www prefix)
    pub fn canonicalize_domain(domain: &str) -> String {
        let domain_lower = domain.to_lowercase();
        if let Some(stripped) = domain_lower.strip_prefix("www.") {
            stripped.to_string()
        } else {
            domain_lower
        }
    }

    /// Registrable domain (eTLD+1): `mail.example.co.uk` -> `example.co.uk`.
    /// IP literals and single-label hosts are returned unchanged.
    pub fn root_domain(host: &str) -> String {
        let host = host.trim_end_matches('.').to_lowercase();
        if Self::is_ip_literal(&host) {
            return host;
        }
        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() <= 2 {
            return host;
        }

        let last_two = labels[labels.len() - 2..].join(".");
        let keep = if COMPOUND_TLDS.contains(&last_two.as_str()) {
            3
        } else {
            2
        };
        labels[labels.len() - keep..].join(".")
    }

    pub fn is_ip_literal(host: &str) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        host.parse::<std::net::IpAddr>().is_ok()
    }

    /// Last dot-separated label.
    pub fn tld(host: &str) -> String {
        host.trim_end_matches('.')
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            DomainUtils::extract_domain("user@Example.com"),
            Some("example.com".to_string())
        );
        assert_eq!(
            DomainUtils::extract_domain("<bounce@mail.test.org>"),
            Some("mail.test.org".to_string())
        );
        assert_eq!(DomainUtils::extract_domain("invalid"), None);
    }

    #[test]
    fn test_matches_domain_list() {
        let domains = ["example.com", "test.org"];

        assert!(DomainUtils::matches_domain_list("example.com", &domains));
        assert!(DomainUtils::matches_domain_list("mail.example.com", &domains));
        assert!(!DomainUtils::matches_domain_list("notexample.com", &domains));
        assert!(!DomainUtils::matches_domain_list("other.com", &domains));
    }

    #[test]
    fn test_canonicalize_domain() {
        assert_eq!(
            DomainUtils::canonicalize_domain("www.example.com"),
            "example.com"
        );
        assert_eq!(DomainUtils::canonicalize_domain("example.com"), "example.com");
    }

    #[test]
    fn test_root_domain() {
        assert_eq!(DomainUtils::root_domain("mail.example.co.uk"), "example.co.uk");
        assert_eq!(DomainUtils::root_domain("a.b.shop.example.com"), "example.com");
        assert_eq!(DomainUtils::root_domain("example.com"), "example.com");
        assert_eq!(DomainUtils::root_domain("www.site.com.au"), "site.com.au");
        assert_eq!(DomainUtils::root_domain("192.168.1.1"), "192.168.1.1");
        assert_eq!(DomainUtils::root_domain("localhost"), "localhost");
    }

    #[test]
    fn test_tld() {
        assert_eq!(DomainUtils::tld("sub.example.TK"), "tk");
        assert_eq!(DomainUtils::tld("localhost"), "localhost");
    }
}
