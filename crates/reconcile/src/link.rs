//! Cross-resource links
//!
//! Every object is addressable as `/org/{org}/{kind}/[{scope}/]{name}`.
//! Declared configuration may use either that full form or a short name.

use crate::object::Link;
use regex::Regex;
use std::sync::LazyLock;

static LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/org/[^/]+/.*|//.+)$").expect("link pattern is valid"));

/// True when `value` is already a full (or `//`-relative) link
pub fn is_link(value: &str) -> bool {
    LINK_PATTERN.is_match(value)
}

/// Full link of an object
pub fn self_link(org: &str, kind: &str, scope: Option<&str>, name: &str) -> String {
    match scope {
        Some(scope) => format!("/org/{org}/{kind}/{scope}/{name}"),
        None => format!("/org/{org}/{kind}/{name}"),
    }
}

/// Last path segment of a link
pub fn name_from_link(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}

/// The `rel == "self"` link of an envelope
pub fn self_link_of(links: &[Link]) -> Option<&str> {
    links
        .iter()
        .find(|l| l.rel == "self")
        .map(|l| l.href.as_str())
}

/// Resolves short names to links within one org
#[derive(Debug, Clone, Copy)]
pub struct LinkResolver<'a> {
    org: &'a str,
}

impl<'a> LinkResolver<'a> {
    pub fn new(org: &'a str) -> Self {
        Self { org }
    }

    pub fn org(&self) -> &str {
        self.org
    }

    pub fn self_link(&self, kind: &str, scope: Option<&str>, name: &str) -> String {
        self_link(self.org, kind, scope, name)
    }

    /// Expand a short name; full links are returned unchanged
    pub fn resolve(&self, kind: &str, scope: Option<&str>, value: &str) -> String {
        if is_link(value) {
            value.to_string()
        } else {
            self.self_link(kind, scope, value)
        }
    }

    /// Full `/org/{org}/...` form of a reference
    ///
    /// Unlike [`resolve`](Self::resolve), the `//{kind}/[{scope}/]{name}`
    /// shorthand is rooted in this org, so equivalent spellings compare equal.
    pub fn canonical(&self, kind: &str, scope: Option<&str>, value: &str) -> String {
        match value.strip_prefix("//") {
            Some(rest) => format!("/org/{}/{rest}", self.org),
            None => self.resolve(kind, scope, value),
        }
    }

    /// Whether two spellings reference the same object
    pub fn same(&self, kind: &str, scope: Option<&str>, a: &str, b: &str) -> bool {
        self.canonical(kind, scope, a) == self.canonical(kind, scope, b)
    }

    /// Inverse of [`resolve`](Self::resolve): the short name when `link` is
    /// this org's link of `kind` in `scope`, otherwise `link` unchanged
    pub fn shorten(&self, kind: &str, scope: Option<&str>, link: &str) -> String {
        let prefix = match scope {
            Some(scope) => format!("/org/{}/{kind}/{scope}/", self.org),
            None => format!("/org/{}/{kind}/", self.org),
        };
        match link.strip_prefix(&prefix) {
            Some(name) if !name.is_empty() && !name.contains('/') => name.to_string(),
            _ => link.to_string(),
        }
    }

    /// Spell `link` the way `hint` did when the hint resolves to it
    pub fn respell(&self, kind: &str, scope: Option<&str>, link: &str, hint: Option<&str>) -> String {
        match hint {
            Some(h) if self.same(kind, scope, h, link) => h.to_string(),
            _ => self.shorten(kind, scope, link),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_link_scoped() {
        assert_eq!(
            self_link("acme", "workload", Some("prod-gvc"), "worker-1"),
            "/org/acme/workload/prod-gvc/worker-1"
        );
        assert_eq!(self_link("acme", "gvc", None, "prod"), "/org/acme/gvc/prod");
    }

    #[test]
    fn test_name_from_link() {
        assert_eq!(name_from_link("/org/acme/workload/prod-gvc/worker-1"), "worker-1");
        assert_eq!(name_from_link("plain"), "plain");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let links = LinkResolver::new("acme");
        for input in ["aws-us-east-1", "/org/other/location/x", "//secret/s"] {
            let once = links.resolve("location", None, input);
            assert_eq!(links.resolve("location", None, &once), once);
        }
        assert_eq!(
            links.resolve("location", None, "aws-us-east-1"),
            "/org/acme/location/aws-us-east-1"
        );
        assert_eq!(links.resolve("secret", None, "//secret/s"), "//secret/s");
    }

    #[test]
    fn test_resolve_is_idempotent_for_scoped_kinds() {
        let links = LinkResolver::new("acme");
        for input in ["worker", "/org/acme/identity/prod-gvc/worker", "//identity/prod-gvc/worker"] {
            let once = links.resolve("identity", Some("prod-gvc"), input);
            assert_eq!(links.resolve("identity", Some("prod-gvc"), &once), once);
        }
        assert_eq!(
            links.resolve("identity", Some("prod-gvc"), "worker"),
            "/org/acme/identity/prod-gvc/worker"
        );
    }

    #[test]
    fn test_canonical_roots_shorthand_in_org() {
        let links = LinkResolver::new("acme");
        assert_eq!(links.canonical("ipset", None, "//ipset/edge"), "/org/acme/ipset/edge");
        assert_eq!(links.canonical("ipset", None, "edge"), "/org/acme/ipset/edge");
        assert_eq!(
            links.canonical("identity", Some("prod-gvc"), "//identity/prod-gvc/worker"),
            "/org/acme/identity/prod-gvc/worker"
        );
        assert!(links.same("ipset", None, "//ipset/edge", "/org/acme/ipset/edge"));
        assert!(!links.same("ipset", None, "//ipset/edge", "/org/other/ipset/edge"));
    }

    #[test]
    fn test_shorten_only_own_org_and_kind() {
        let links = LinkResolver::new("acme");
        assert_eq!(links.shorten("secret", None, "/org/acme/secret/db"), "db");
        assert_eq!(
            links.shorten("secret", None, "/org/other/secret/db"),
            "/org/other/secret/db"
        );
        assert_eq!(
            links.shorten("secret", None, "/org/acme/location/db"),
            "/org/acme/location/db"
        );
        assert_eq!(
            links.shorten("identity", Some("prod"), "/org/acme/identity/prod/id"),
            "id"
        );
    }

    #[test]
    fn test_respell_prefers_hint() {
        let links = LinkResolver::new("acme");
        let link = "/org/acme/secret/db";
        assert_eq!(links.respell("secret", None, link, Some(link)), link);
        assert_eq!(links.respell("secret", None, link, Some("db")), "db");
        assert_eq!(links.respell("secret", None, link, Some("other")), "db");
        assert_eq!(links.respell("secret", None, link, None), "db");
        assert_eq!(links.respell("secret", None, link, Some("//secret/db")), "//secret/db");
    }

    #[test]
    fn test_self_link_of() {
        let links = vec![
            Link {
                rel: "org".into(),
                href: "/org/acme".into(),
            },
            Link {
                rel: "self".into(),
                href: "/org/acme/gvc/prod".into(),
            },
        ];
        assert_eq!(self_link_of(&links), Some("/org/acme/gvc/prod"));
        assert_eq!(self_link_of(&[]), None);
    }
}
