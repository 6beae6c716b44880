//! Resource addresses (`kind.name` or `kind.scope.name`)

use crate::error::{Error, Result};
use crate::schema::{KindSchema, NAME_KEY};
use crate::transform::scope_of;
use crate::tree::ConfigTree;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of one declared instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub name: String,
}

impl Address {
    pub fn new(kind: impl Into<String>, scope: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            scope: scope.map(str::to_string),
            name: name.into(),
        }
    }

    /// Address of a declared tree; name and (for grouped kinds) scope must be set
    pub fn of(schema: &KindSchema, tree: &ConfigTree) -> Result<Self> {
        let name = tree
            .str(NAME_KEY)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::validation(NAME_KEY, tree.get(NAME_KEY).summary(), "is required"))?;
        let scope = scope_of(schema, tree)?;
        Ok(Self::new(schema.kind, scope, name))
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}.{}.{}", self.kind, scope, self.name),
            None => write!(f, "{}.{}", self.kind, self.name),
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [kind, name] if !kind.is_empty() && !name.is_empty() => Ok(Self::new(*kind, None, *name)),
            [kind, scope, name] if !kind.is_empty() && !scope.is_empty() && !name.is_empty() => {
                Ok(Self::new(*kind, Some(*scope), *name))
            }
            _ => Err(Error::validation(
                "address",
                s,
                "expected kind.name or kind.scope.name",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{IDENTITY, WIDGET, tree};
    use serde_json::json;

    #[test]
    fn test_display_and_parse() {
        let scoped = Address::new("identity", Some("prod"), "worker");
        assert_eq!(scoped.to_string(), "identity.prod.worker");
        assert_eq!("identity.prod.worker".parse::<Address>().unwrap(), scoped);

        let plain = Address::new("gvc", None, "prod");
        assert_eq!(plain.to_string(), "gvc.prod");
        assert_eq!("gvc.prod".parse::<Address>().unwrap(), plain);

        assert!("gvc".parse::<Address>().is_err());
        assert!("a.b.c.d".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_of_tree() {
        let t = tree(&[("name", json!("worker")), ("gvc", json!("prod"))]);
        assert_eq!(
            Address::of(&IDENTITY, &t).unwrap(),
            Address::new("identity", Some("prod"), "worker")
        );
        assert!(Address::of(&IDENTITY, &tree(&[("name", json!("worker"))])).is_err());
        assert!(Address::of(&WIDGET, &tree(&[])).is_err());
    }
}
