//! Common types used across CLI modules

use uuid::Uuid;

/// Identifier that can be either a full UUID or an unambiguous prefix
#[derive(Debug, Clone)]
pub enum IdOrPrefix {
    /// Full UUID
    Full(Uuid),
    /// Prefix that should uniquely identify a resource
    Prefix(String),
}

impl IdOrPrefix {
    /// Parse a string into an IdOrPrefix
    ///
    /// Attempts to parse as a full UUID first, otherwise treats as a prefix
    pub fn parse(input: &str) -> Self {
        if let Ok(uuid) = Uuid::parse_str(input) {
            IdOrPrefix::Full(uuid)
        } else {
            IdOrPrefix::Prefix(input.to_string())
        }
    }

    /// Get the UUID if this is a full ID
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            IdOrPrefix::Full(uuid) => Some(*uuid),
            IdOrPrefix::Prefix(_) => None,
        }
    }

    /// Get the prefix string
    pub fn as_str(&self) -> String {
        match self {
            IdOrPrefix::Full(uuid) => uuid.to_string(),
            IdOrPrefix::Prefix(prefix) => prefix.clone(),
        }
    }
}

impl std::fmt::Display for IdOrPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdOrPrefix::Full(uuid) => write!(f, "{}", uuid),
            IdOrPrefix::Prefix(prefix) => write!(f, "{}", prefix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_uuid() {
        let id = Uuid::new_v4();
        let parsed = IdOrPrefix::parse(&id.to_string());
        assert_eq!(parsed.as_uuid(), Some(id));
    }

    #[test]
    fn test_parse_prefix() {
        let parsed = IdOrPrefix::parse("3f2a");
        assert!(parsed.as_uuid().is_none());
        assert_eq!(parsed.as_str(), "3f2a");
        assert_eq!(parsed.to_string(), "3f2a");
    }
}
