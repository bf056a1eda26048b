//! Error types for the factory system
//!
//! Every fallible factory operation returns [`FactoryResult`]. Failures raised
//! by the record store are carried through nested creates unchanged.

use crate::association::AssociationKind;

/// Factory result type alias
pub type FactoryResult<T> = Result<T, FactoryError>;

/// Error types for factory and association operations
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("Association '{key}' has unsupported kind {kind:?}")]
    UnsupportedAssociationKind { key: String, kind: AssociationKind },

    #[error("Association '{key}' is missing required option '{option}'")]
    MissingOption { key: String, option: &'static str },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Factory '{0}' is not registered")]
    FactoryNotRegistered(String),

    #[error("Factory '{0}' is already registered")]
    DuplicateFactory(String),

    #[error("Factory '{factory}' has no trait named '{name}'")]
    UnknownTrait { factory: String, name: String },

    #[error("Factory '{factory}' does not define attributes: {}", keys.join(", "))]
    UnknownAttributes { factory: String, keys: Vec<String> },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FactoryError {
    pub(crate) fn poisoned(what: &str) -> Self {
        FactoryError::Configuration(format!("{} lock poisoned", what))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_association() {
        let err = FactoryError::MissingOption {
            key: "comments".to_string(),
            option: "count",
        };
        assert_eq!(
            err.to_string(),
            "Association 'comments' is missing required option 'count'"
        );

        let err = FactoryError::UnsupportedAssociationKind {
            key: "tags".to_string(),
            kind: AssociationKind::ManyToMany,
        };
        assert!(err.to_string().contains("ManyToMany"));
    }

    #[test]
    fn test_unknown_attributes_lists_keys() {
        let err = FactoryError::UnknownAttributes {
            factory: "user".to_string(),
            keys: vec!["boobly".to_string(), "shoe_size".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Factory 'user' does not define attributes: boobly, shoe_size"
        );
    }
}
