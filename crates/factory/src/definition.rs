//! Factory definitions
//!
//! A [`FactoryDefinition`] declares how to build records of one relation:
//! its attributes, named traits and associations. Definitions are inert until
//! handed to [`FactoryRegistry::define`](crate::registry::FactoryRegistry::define).
//!
//! ```ignore
//! registry.define(
//!     FactoryDefinition::new("post", "posts")
//!         .attribute("title", "Hello")
//!         .sequence("slug", |n| json!(format!("post-{}", n)))
//!         .trait_def("published", |t| t.attribute("published", true))
//!         .association(AssociationDecl::belongs_to("author", "users").factory("user"))
//!         .association(
//!             AssociationDecl::has_many("comments", "comments")
//!                 .foreign_key("post_id")
//!                 .factory("comment")
//!                 .count(2),
//!         ),
//! )?;
//! ```

use std::sync::Arc;

use serde_json::Value;

use crate::association::{AssociationDescriptor, AssociationKind, AssociationOptions};
use crate::attributes::{AttributeDef, AttributeDefs};

/// Declarative description of one factory
#[derive(Debug, Clone)]
pub struct FactoryDefinition {
    name: String,
    relation: String,
    attributes: AttributeDefs,
    traits: Vec<(String, AttributeDefs)>,
    associations: Vec<AssociationDecl>,
}

/// Named attribute overlay applied on request
#[derive(Debug, Clone, Default)]
pub struct TraitDefinition {
    attributes: AttributeDefs,
}

impl TraitDefinition {
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.set(name, AttributeDef::Static(value.into()));
        self
    }

    pub fn callable<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.attributes.set(name, AttributeDef::Callable(Arc::new(f)));
        self
    }

    pub fn sequence<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(u64) -> Value + Send + Sync + 'static,
    {
        self.attributes.set(name, AttributeDef::Sequence(Arc::new(f)));
        self
    }
}

/// Pieces of a definition consumed by the registry
pub(crate) struct DefinitionParts {
    pub name: String,
    pub relation: String,
    pub attributes: AttributeDefs,
    pub traits: Vec<(String, AttributeDefs)>,
    pub associations: Vec<AssociationDecl>,
}

impl FactoryDefinition {
    pub fn new(name: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relation: relation.into(),
            attributes: AttributeDefs::new(),
            traits: Vec::new(),
            associations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn attributes(&self) -> &AttributeDefs {
        &self.attributes
    }

    pub fn associations(&self) -> &[AssociationDecl] {
        &self.associations
    }

    /// Static value copied into every record
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.set(name, AttributeDef::Static(value.into()));
        self
    }

    /// Value computed afresh for every record
    pub fn callable<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.attributes.set(name, AttributeDef::Callable(Arc::new(f)));
        self
    }

    /// Value computed from the factory's sequence number
    pub fn sequence<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(u64) -> Value + Send + Sync + 'static,
    {
        self.attributes.set(name, AttributeDef::Sequence(Arc::new(f)));
        self
    }

    /// Declare a named trait. Redeclaring a trait replaces it.
    pub fn trait_def<F>(mut self, name: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(TraitDefinition) -> TraitDefinition,
    {
        let name = name.into();
        let overlay = build(TraitDefinition::default()).attributes;
        match self.traits.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = overlay,
            None => self.traits.push((name, overlay)),
        }
        self
    }

    pub fn association(mut self, decl: AssociationDecl) -> Self {
        self.associations.retain(|existing| existing.key != decl.key);
        self.associations.push(decl);
        self
    }

    pub(crate) fn into_parts(self) -> DefinitionParts {
        DefinitionParts {
            name: self.name,
            relation: self.relation,
            attributes: self.attributes,
            traits: self.traits,
            associations: self.associations,
        }
    }
}

/// Declared association of a factory, turned into a descriptor on registration
#[derive(Debug, Clone)]
pub struct AssociationDecl {
    kind: AssociationKind,
    key: String,
    foreign_key: Option<String>,
    source_relation: Option<String>,
    target_relation: String,
    primary_key: Option<String>,
    factory: String,
    traits: Vec<String>,
    options: AssociationOptions,
}

impl AssociationDecl {
    fn new(kind: AssociationKind, key: impl Into<String>, target_relation: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            kind,
            factory: key.clone(),
            key,
            foreign_key: None,
            source_relation: None,
            target_relation: target_relation.into(),
            primary_key: None,
            traits: Vec::new(),
            options: AssociationOptions::default(),
        }
    }

    /// Many-to-one; the foreign key defaults to `<key>_id`
    pub fn belongs_to(key: impl Into<String>, target_relation: impl Into<String>) -> Self {
        let decl = Self::new(AssociationKind::ManyToOne, key, target_relation);
        let foreign_key = format!("{}_id", decl.key);
        decl.foreign_key(foreign_key)
    }

    /// One-to-many; requires a foreign key and a count
    pub fn has_many(key: impl Into<String>, target_relation: impl Into<String>) -> Self {
        Self::new(AssociationKind::OneToMany, key, target_relation)
    }

    /// One-to-one; requires a foreign key
    pub fn has_one(key: impl Into<String>, target_relation: impl Into<String>) -> Self {
        Self::new(AssociationKind::OneToOne, key, target_relation)
    }

    /// Use a fully specified descriptor
    pub fn from_descriptor(descriptor: AssociationDescriptor, factory: impl Into<String>) -> Self {
        Self {
            kind: descriptor.kind,
            key: descriptor.key,
            foreign_key: Some(descriptor.foreign_key),
            source_relation: Some(descriptor.source_relation),
            target_relation: descriptor.target_relation,
            primary_key: Some(descriptor.primary_key),
            factory: factory.into(),
            traits: Vec::new(),
            options: AssociationOptions::default(),
        }
    }

    pub fn foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    pub fn primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = Some(primary_key.into());
        self
    }

    /// Factory used to build related records; defaults to the key
    pub fn factory(mut self, factory: impl Into<String>) -> Self {
        self.factory = factory.into();
        self
    }

    /// Traits applied to every related record
    pub fn traits<I, S>(mut self, traits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.traits = traits.into_iter().map(Into::into).collect();
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.options = self.options.with_count(count);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn factory_name(&self) -> &str {
        &self.factory
    }

    pub(crate) fn trait_names(&self) -> &[String] {
        &self.traits
    }

    pub(crate) fn options(&self) -> &AssociationOptions {
        &self.options
    }

    /// Descriptor for this association declared on `relation`
    pub fn descriptor(&self, relation: &str) -> AssociationDescriptor {
        let descriptor = AssociationDescriptor::new(
            self.kind,
            self.key.clone(),
            self.foreign_key.clone().unwrap_or_default(),
            self.source_relation.clone().unwrap_or_else(|| relation.to_string()),
            self.target_relation.clone(),
        );
        match &self.primary_key {
            Some(primary_key) => descriptor.with_primary_key(primary_key.clone()),
            None => descriptor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_belongs_to_defaults() {
        let decl = AssociationDecl::belongs_to("author", "users").factory("user");
        let descriptor = decl.descriptor("posts");

        assert_eq!(descriptor.kind, AssociationKind::ManyToOne);
        assert_eq!(descriptor.foreign_key, "author_id");
        assert_eq!(descriptor.source_relation, "posts");
        assert_eq!(descriptor.target_relation, "users");
        assert_eq!(descriptor.primary_key, "id");
        assert_eq!(decl.factory_name(), "user");
    }

    #[test]
    fn test_has_many_without_foreign_key_fails_validation() {
        let decl = AssociationDecl::has_many("comments", "comments").count(2);
        assert!(decl.descriptor("posts").validate().is_err());

        let decl = decl.foreign_key("post_id");
        assert!(decl.descriptor("posts").validate().is_ok());
        assert_eq!(decl.options().count, Some(2));
        assert_eq!(decl.factory_name(), "comments");
    }

    #[test]
    fn test_from_descriptor_keeps_source_relation() {
        let decl = AssociationDecl::from_descriptor(
            AssociationDescriptor::one_to_many("posts", "author_id", "users", "posts"),
            "post",
        );
        assert_eq!(decl.descriptor("authors").source_relation, "users");
    }

    #[test]
    fn test_redeclaring_replaces() {
        let def = FactoryDefinition::new("user", "users")
            .attribute("name", "Jane")
            .trait_def("admin", |t| t.attribute("role", "admin"))
            .trait_def("admin", |t| t.attribute("role", "superadmin"))
            .association(AssociationDecl::has_one("profile", "profiles").foreign_key("user_id"))
            .association(AssociationDecl::has_one("profile", "profiles").foreign_key("owner_id"));

        let parts = def.into_parts();
        assert_eq!(parts.traits.len(), 1);
        assert_eq!(parts.associations.len(), 1);
        assert_eq!(parts.associations[0].descriptor("users").foreign_key, "owner_id");
        assert!(parts.attributes.contains("name"));
    }

    #[test]
    fn test_trait_overlay_contents() {
        let def = FactoryDefinition::new("user", "users")
            .trait_def("numbered", |t| {
                t.sequence("email", |n| json!(format!("user{}@example.com", n)))
                    .callable("token", || json!("t"))
            });
        let parts = def.into_parts();
        let (name, overlay) = &parts.traits[0];
        assert_eq!(name, "numbered");
        assert!(overlay.contains("email"));
        assert!(overlay.contains("token"));

        let mut attrs = crate::attributes::AttributeSet::new();
        overlay.evaluate_into(&mut attrs, 7);
        assert_eq!(attrs["email"], json!("user7@example.com"));
        assert_eq!(attrs["token"], json!("t"));
    }
}
