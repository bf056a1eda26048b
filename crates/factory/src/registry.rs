//! Factory registry
//!
//! Holds every defined factory by name and wires associations between them.
//! Association targets are looked up lazily, so factories may reference each
//! other in any definition order.
//!
//! The registry does not detect creation cycles: two factories whose
//! associations unconditionally create each other recurse without bound.
//! Break such cycles with overrides or by declaring only one direction.

use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::association::{Association, BuilderRef};
use crate::attributes::{AttributeSet, Record};
use crate::builder::{FactoryBuilder, RecordBuilder};
use crate::config::{factory_config, FactoryConfig};
use crate::definition::FactoryDefinition;
use crate::error::{FactoryError, FactoryResult};
use crate::store::{MemoryStore, RecordStore};

struct RegistryInner {
    factories: DashMap<String, Arc<FactoryBuilder>>,
    store: Arc<dyn RecordStore>,
    config: FactoryConfig,
}

impl RegistryInner {
    fn lookup(&self, name: &str) -> FactoryResult<Arc<FactoryBuilder>> {
        self.factories
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| FactoryError::FactoryNotRegistered(name.to_string()))
    }
}

/// Named factories sharing one record store
#[derive(Clone)]
pub struct FactoryRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FactoryRegistry {
    /// Registry over a fresh in-memory store using the global configuration
    pub fn new() -> Self {
        let config = factory_config().unwrap_or_default();
        Self::with_config(config)
    }

    pub fn with_config(config: FactoryConfig) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    pub fn with_store(store: Arc<dyn RecordStore>, config: FactoryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                factories: DashMap::new(),
                store,
                config,
            }),
        }
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.inner.config
    }

    /// Register a factory; names are unique per registry
    pub fn define(&self, definition: FactoryDefinition) -> FactoryResult<()> {
        if self.inner.factories.contains_key(definition.name()) {
            return Err(FactoryError::DuplicateFactory(definition.name().to_string()));
        }

        let parts = definition.into_parts();
        let associations = parts
            .associations
            .iter()
            .map(|decl| {
                let descriptor = decl.descriptor(&parts.relation);
                if descriptor.kind.is_dependent() && descriptor.source_relation != parts.relation {
                    return Err(FactoryError::Configuration(format!(
                        "Association '{}' of factory '{}' is declared on '{}' but the factory builds '{}'",
                        descriptor.key, parts.name, descriptor.source_relation, parts.relation
                    )));
                }
                Association::new(
                    descriptor,
                    self.builder_ref(decl.factory_name()),
                    decl.trait_names().to_vec(),
                    decl.options().clone(),
                )
            })
            .collect::<FactoryResult<Vec<_>>>()?;

        let name = parts.name.clone();
        let relation = parts.relation.clone();
        let builder = FactoryBuilder::new(
            parts,
            associations,
            Arc::clone(&self.inner.store),
            self.inner.config.clone(),
        );

        match self.inner.factories.entry(name.clone()) {
            Entry::Occupied(_) => Err(FactoryError::DuplicateFactory(name)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(builder));
                tracing::info!("Registered factory '{}' for '{}'", name, relation);
                Ok(())
            }
        }
    }

    fn builder_ref(&self, factory: &str) -> BuilderRef {
        let registry: Weak<RegistryInner> = Arc::downgrade(&self.inner);
        let factory = factory.to_string();
        Box::new(move || -> FactoryResult<Arc<dyn RecordBuilder>> {
            let inner = registry.upgrade().ok_or_else(|| {
                FactoryError::Configuration(format!(
                    "Registry for factory '{}' no longer exists",
                    factory
                ))
            })?;
            let builder: Arc<dyn RecordBuilder> = inner.lookup(&factory)?;
            Ok(builder)
        })
    }

    pub fn builder(&self, name: &str) -> FactoryResult<Arc<FactoryBuilder>> {
        self.inner.lookup(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.factories.contains_key(name)
    }

    pub fn factory_count(&self) -> usize {
        self.inner.factories.len()
    }

    /// Build, persist and return a record with its associations
    pub fn create(&self, name: &str, traits: &[&str], overrides: Value) -> FactoryResult<Record> {
        let builder = self.builder(name)?;
        builder.create(&trait_list(traits), to_attributes(overrides)?)
    }

    /// Build a record without persisting it or resolving associations
    pub fn build(&self, name: &str, traits: &[&str], overrides: Value) -> FactoryResult<Record> {
        let builder = self.builder(name)?;
        builder.build(&trait_list(traits), to_attributes(overrides)?)
    }

    pub fn create_many(
        &self,
        name: &str,
        count: usize,
        traits: &[&str],
        overrides: Value,
    ) -> FactoryResult<Vec<Record>> {
        let builder = self.builder(name)?;
        let traits = trait_list(traits);
        let overrides = to_attributes(overrides)?;
        (0..count)
            .map(|_| builder.create(&traits, overrides.clone()))
            .collect()
    }

    /// Create a record and deserialize it into `T`
    pub fn create_as<T: DeserializeOwned>(
        &self,
        name: &str,
        traits: &[&str],
        overrides: Value,
    ) -> FactoryResult<T> {
        let record = self.create(name, traits, overrides)?;
        Ok(serde_json::from_value(record)?)
    }
}

fn trait_list(traits: &[&str]) -> Vec<String> {
    traits.iter().map(|name| name.to_string()).collect()
}

/// Caller overrides must be a JSON object; `null` means none
pub fn to_attributes(value: Value) -> FactoryResult<AttributeSet> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(AttributeSet::new()),
        other => Err(FactoryError::Configuration(format!(
            "Overrides must be a JSON object, got {}",
            other
        ))),
    }
}

/// Process-wide registry
static FACTORIES: Lazy<FactoryRegistry> = Lazy::new(FactoryRegistry::new);

/// The process-wide registry, created on first use with the global configuration
pub fn factories() -> &'static FactoryRegistry {
    &FACTORIES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::AssociationDecl;
    use serde_json::json;

    fn registry() -> FactoryRegistry {
        FactoryRegistry::with_config(FactoryConfig::default())
    }

    #[test]
    fn test_factory_registry_creation() {
        let registry = registry();
        assert_eq!(registry.factory_count(), 0);
        assert!(!registry.contains("user"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let registry = registry();
        registry.define(FactoryDefinition::new("user", "users")).unwrap();

        let err = registry.define(FactoryDefinition::new("user", "users")).unwrap_err();
        assert!(matches!(err, FactoryError::DuplicateFactory(ref name) if name == "user"));
        assert_eq!(registry.factory_count(), 1);
    }

    #[test]
    fn test_dependent_association_must_be_declared_on_own_relation() {
        let registry = registry();
        let err = registry
            .define(
                FactoryDefinition::new("user", "users").association(AssociationDecl::from_descriptor(
                    crate::association::AssociationDescriptor::one_to_many(
                        "posts", "author_id", "accounts", "posts",
                    ),
                    "post",
                )),
            )
            .unwrap_err();

        assert!(matches!(err, FactoryError::Configuration(_)));
        assert!(!registry.contains("user"));
    }

    #[test]
    fn test_unsupported_kind_rejected_at_definition() {
        let registry = registry();
        let err = registry
            .define(
                FactoryDefinition::new("post", "posts").association(AssociationDecl::from_descriptor(
                    crate::association::AssociationDescriptor::new(
                        crate::association::AssociationKind::ManyToMany,
                        "tags",
                        "tag_id",
                        "posts",
                        "tags",
                    ),
                    "tag",
                )),
            )
            .unwrap_err();

        assert!(matches!(err, FactoryError::UnsupportedAssociationKind { .. }));
    }

    #[test]
    fn test_missing_target_factory_reported_on_use() {
        let registry = registry();
        registry
            .define(
                FactoryDefinition::new("post", "posts")
                    .association(AssociationDecl::belongs_to("author", "users").factory("user")),
            )
            .unwrap();

        let err = registry.create("post", &[], Value::Null).unwrap_err();
        assert!(matches!(err, FactoryError::FactoryNotRegistered(ref name) if name == "user"));
        // nothing was written for the owning record
        assert_eq!(registry.store().count("posts"), 0);

        registry
            .define(FactoryDefinition::new("user", "users").attribute("name", "Jane"))
            .unwrap();
        let post = registry.create("post", &[], Value::Null).unwrap();
        assert_eq!(post["author"]["name"], json!("Jane"));
    }

    #[test]
    fn test_overrides_must_be_object() {
        let registry = registry();
        registry.define(FactoryDefinition::new("user", "users")).unwrap();

        assert!(matches!(
            registry.create("user", &[], json!([1, 2])),
            Err(FactoryError::Configuration(_))
        ));
        assert!(to_attributes(Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_factory() {
        assert!(matches!(
            registry().create("ghost", &[], Value::Null),
            Err(FactoryError::FactoryNotRegistered(_))
        ));
    }

    #[test]
    fn test_dropped_registry_reported_by_builder_ref() {
        let registry = registry();
        let builder_ref = registry.builder_ref("user");
        drop(registry);

        assert!(matches!(builder_ref(), Err(FactoryError::Configuration(_))));
    }

    #[test]
    fn test_global_registry_is_shared() {
        factories()
            .define(FactoryDefinition::new("registry_test_widget", "widgets"))
            .unwrap();
        assert!(factories().contains("registry_test_widget"));
    }
}
