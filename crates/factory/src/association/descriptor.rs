//! Association descriptors - relationship metadata consumed by resolvers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::{AttributeSet, Record};
use crate::error::{FactoryError, FactoryResult};

/// Defines the kind of relationship between two relations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationKind {
    /// Many-to-one relationship (belongsTo)
    ManyToOne,
    /// One-to-many relationship (hasMany)
    OneToMany,
    /// One-to-one relationship (hasOne)
    OneToOne,
    /// Many-to-many relationship through a pivot relation
    ManyToMany,
}

impl AssociationKind {
    /// Returns true if the related record is created after the owning record
    pub fn is_dependent(self) -> bool {
        matches!(self, Self::OneToMany | Self::OneToOne)
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssociationKind::ManyToOne => "many_to_one",
            AssociationKind::OneToMany => "one_to_many",
            AssociationKind::OneToOne => "one_to_one",
            AssociationKind::ManyToMany => "many_to_many",
        };
        f.write_str(name)
    }
}

impl FromStr for AssociationKind {
    type Err = FactoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "many_to_one" | "belongs_to" => Ok(AssociationKind::ManyToOne),
            "one_to_many" | "has_many" => Ok(AssociationKind::OneToMany),
            "one_to_one" | "has_one" => Ok(AssociationKind::OneToOne),
            "many_to_many" | "belongs_to_many" => Ok(AssociationKind::ManyToMany),
            other => Err(FactoryError::Configuration(format!(
                "Unknown association kind '{}'",
                other
            ))),
        }
    }
}

/// Immutable description of one relationship between two relations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDescriptor {
    /// The kind of relationship
    pub kind: AssociationKind,

    /// Attribute name on the owning side
    pub key: String,

    /// Attribute on the owned side that points at the other record
    pub foreign_key: String,

    /// Relation that declares the association
    pub source_relation: String,

    /// Relation the association points to
    pub target_relation: String,

    /// Identifier attribute on the referenced record
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl AssociationDescriptor {
    pub fn new(
        kind: AssociationKind,
        key: impl Into<String>,
        foreign_key: impl Into<String>,
        source_relation: impl Into<String>,
        target_relation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            key: key.into(),
            foreign_key: foreign_key.into(),
            source_relation: source_relation.into(),
            target_relation: target_relation.into(),
            primary_key: default_primary_key(),
        }
    }

    /// `posts.author_id -> users.id`
    pub fn many_to_one(
        key: impl Into<String>,
        foreign_key: impl Into<String>,
        source_relation: impl Into<String>,
        target_relation: impl Into<String>,
    ) -> Self {
        Self::new(AssociationKind::ManyToOne, key, foreign_key, source_relation, target_relation)
    }

    /// `users.id <- posts.author_id`, many posts per user
    pub fn one_to_many(
        key: impl Into<String>,
        foreign_key: impl Into<String>,
        source_relation: impl Into<String>,
        target_relation: impl Into<String>,
    ) -> Self {
        Self::new(AssociationKind::OneToMany, key, foreign_key, source_relation, target_relation)
    }

    /// `users.id <- profiles.user_id`, at most one profile per user
    pub fn one_to_one(
        key: impl Into<String>,
        foreign_key: impl Into<String>,
        source_relation: impl Into<String>,
        target_relation: impl Into<String>,
    ) -> Self {
        Self::new(AssociationKind::OneToOne, key, foreign_key, source_relation, target_relation)
    }

    /// Set the identifier attribute of the referenced record
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Wire `related` into a copy of `attrs`.
    ///
    /// For a many-to-one association `related` is the referenced parent and
    /// `attrs` belong to the owning record. For one-to-many and one-to-one
    /// associations `related` is the persisted parent and `attrs` become the
    /// child's attributes. Either way the foreign key receives the referenced
    /// record's primary key. A related value without an identifier leaves the
    /// attributes untouched.
    pub fn associate(&self, attrs: &AttributeSet, related: &Record) -> AttributeSet {
        let mut associated = attrs.clone();
        match self.related_id(related) {
            Some(id) => {
                associated.insert(self.foreign_key.clone(), id);
            }
            None => {
                tracing::debug!(
                    "Association '{}' skipped wiring '{}': related value has no '{}'",
                    self.key,
                    self.foreign_key,
                    self.primary_key
                );
            }
        }
        associated
    }

    fn related_id(&self, related: &Record) -> Option<Value> {
        related
            .get(&self.primary_key)
            .filter(|id| !id.is_null())
            .cloned()
    }

    /// Validate the descriptor for consistency
    pub fn validate(&self) -> FactoryResult<()> {
        if self.key.is_empty() {
            return Err(FactoryError::Configuration(
                "Association key cannot be empty".to_string(),
            ));
        }

        if self.foreign_key.is_empty() {
            return Err(FactoryError::Configuration(format!(
                "Association '{}' must name a foreign key",
                self.key
            )));
        }

        if self.source_relation.is_empty() || self.target_relation.is_empty() {
            return Err(FactoryError::Configuration(format!(
                "Association '{}' must name both source and target relations",
                self.key
            )));
        }

        if self.key == self.foreign_key {
            return Err(FactoryError::Configuration(format!(
                "Association '{}' key and foreign key must be different",
                self.key
            )));
        }

        Ok(())
    }
}
