//! Value rules checked before anything is sent

use crate::error::{Error, Result};
use crate::link::is_link;
use crate::schema::Rule;
use crate::tree::Leaf;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

pub const MAX_NAME_LEN: usize = 63;
pub const MAX_DESCRIPTION_LEN: usize = 250;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]([-a-z0-9])*[a-z0-9]$").expect("name pattern is valid"));

/// Compiled [`Rule::Regex`] patterns, keyed by source
static PATTERNS: LazyLock<Mutex<HashMap<&'static str, Regex>>> = LazyLock::new(Mutex::default);

fn compiled(path: &str, source: &'static str) -> Result<Regex> {
    let mut patterns = PATTERNS.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(re) = patterns.get(source) {
        return Ok(re.clone());
    }
    let re = Regex::new(source).map_err(|e| Error::Schema {
        kind: path.to_string(),
        message: e.to_string(),
    })?;
    patterns.insert(source, re.clone());
    Ok(re)
}

/// Check every rule against a declared leaf
///
/// Rules on strings apply to each element of a set or list.
pub fn check_rules(path: &str, rules: &[Rule], leaf: &Leaf) -> Result<()> {
    for rule in rules {
        match leaf {
            Leaf::Set(items) => {
                for item in items {
                    check_str(path, rule, item)?;
                }
            }
            Leaf::List(items) => {
                for item in items {
                    check_str(path, rule, item)?;
                }
            }
            Leaf::Str(s) => check_str(path, rule, s)?,
            Leaf::Int(i) => check_int(path, rule, *i)?,
            Leaf::Float(_) | Leaf::Bool(_) | Leaf::Map(_) | Leaf::Blocks(_) => {}
        }
    }
    Ok(())
}

fn check_str(path: &str, rule: &Rule, value: &str) -> Result<()> {
    let fail = |reason: String| Err(Error::validation(path, value, reason));
    match rule {
        Rule::Name => {
            if value.len() > MAX_NAME_LEN {
                return fail(format!("must be at most {MAX_NAME_LEN} characters"));
            }
            if !NAME_PATTERN.is_match(value) {
                return fail(
                    "must start with a lowercase letter, end with a letter or digit, \
                     and contain only lowercase letters, digits and dashes"
                        .to_string(),
                );
            }
        }
        Rule::Description => {
            if value.trim() != value {
                return fail("must not have leading or trailing whitespace".to_string());
            }
            if value.chars().count() > MAX_DESCRIPTION_LEN {
                return fail(format!("must be at most {MAX_DESCRIPTION_LEN} characters"));
            }
        }
        &Rule::Regex(pattern) => {
            if !compiled(path, pattern)?.is_match(value) {
                return fail(format!("must match {pattern}"));
            }
        }
        Rule::Length { min, max } => {
            let len = value.chars().count();
            if len < *min || len > *max {
                return fail(format!("length must be between {min} and {max}"));
            }
        }
        Rule::OneOfValues(allowed) => {
            if !allowed.iter().any(|a| *a == value) {
                return fail(format!("must be one of: {}", allowed.join(", ")));
            }
        }
        Rule::Link => {
            if !is_link(value) {
                return fail("must be a full link (/org/{org}/...)".to_string());
            }
        }
        Rule::Range { .. } => {}
    }
    Ok(())
}

fn check_int(path: &str, rule: &Rule, value: i64) -> Result<()> {
    if let Rule::Range { min, max } = rule
        && (value < *min || value > *max)
    {
        return Err(Error::validation(
            path,
            value.to_string(),
            format!("must be between {min} and {max}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_leaf(s: &str) -> Leaf {
        Leaf::Str(s.to_string())
    }

    #[test]
    fn test_name_rule() {
        assert!(check_rules("name", &[Rule::Name], &str_leaf("prod-gvc")).is_ok());
        assert!(check_rules("name", &[Rule::Name], &str_leaf("a1")).is_ok());
        assert!(check_rules("name", &[Rule::Name], &str_leaf("Prod")).is_err());
        assert!(check_rules("name", &[Rule::Name], &str_leaf("prod-")).is_err());
        assert!(check_rules("name", &[Rule::Name], &str_leaf("1prod")).is_err());

        let long = "a".repeat(MAX_NAME_LEN + 1);
        let err = check_rules("name", &[Rule::Name], &str_leaf(&long)).unwrap_err();
        assert!(err.to_string().contains("63"));
    }

    #[test]
    fn test_description_rule() {
        assert!(check_rules("description", &[Rule::Description], &str_leaf("ok")).is_ok());
        assert!(check_rules("description", &[Rule::Description], &str_leaf(" padded")).is_err());
        let long = "x".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(check_rules("description", &[Rule::Description], &str_leaf(&long)).is_err());
    }

    #[test]
    fn test_regex_applies_to_set_elements() {
        let rules = [Rule::Regex(r"^[a-z]+$")];
        let good = Leaf::Set(["a".to_string(), "b".to_string()].into());
        let bad = Leaf::Set(["a".to_string(), "B".to_string()].into());
        assert!(check_rules("x", &rules, &good).is_ok());
        let err = check_rules("x", &rules, &bad).unwrap_err();
        assert!(err.to_string().contains("B"));
    }

    #[test]
    fn test_regex_is_compiled_once() {
        let source = r"^[0-9]+-cached$";
        let rules = [Rule::Regex(source)];
        assert!(check_rules("x", &rules, &str_leaf("12-cached")).is_ok());
        assert!(PATTERNS.lock().unwrap().contains_key(source));
        assert!(check_rules("x", &rules, &str_leaf("ab-cached")).is_err());

        let broken = [Rule::Regex(r"^(unclosed$")];
        assert!(matches!(
            check_rules("x", &broken, &str_leaf("a")),
            Err(Error::Schema { .. })
        ));
    }

    #[test]
    fn test_length_range_and_enum() {
        let length = [Rule::Length { min: 6, max: 30 }];
        assert!(check_rules("project_id", &length, &str_leaf("my-project")).is_ok());
        assert!(check_rules("project_id", &length, &str_leaf("short")).is_err());

        let range = [Rule::Range { min: 1, max: 10 }];
        assert!(check_rules("n", &range, &Leaf::Int(5)).is_ok());
        assert!(check_rules("n", &range, &Leaf::Int(11)).is_err());

        let values = [Rule::OneOfValues(&["jmespath", "javascript"])];
        assert!(check_rules("language", &values, &str_leaf("jmespath")).is_ok());
        assert!(check_rules("language", &values, &str_leaf("lua")).is_err());
    }

    #[test]
    fn test_link_rule() {
        assert!(check_rules("l", &[Rule::Link], &str_leaf("/org/acme/gvc/prod")).is_ok());
        assert!(check_rules("l", &[Rule::Link], &str_leaf("prod")).is_err());
    }
}
