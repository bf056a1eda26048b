//! Record builders
//!
//! [`RecordBuilder`] is what association resolvers call to materialize related
//! records. [`FactoryBuilder`] is the registry's implementation: it evaluates
//! a factory definition, runs many-to-one resolvers, persists the record and
//! then runs the dependent resolvers against the persisted parent.

use std::sync::Arc;

use serde_json::Value;

use crate::association::Association;
use crate::attributes::{merge, AttributeDefs, AttributeSet, Record, Sequence};
use crate::config::FactoryConfig;
use crate::definition::DefinitionParts;
use crate::error::{FactoryError, FactoryResult};
use crate::store::RecordStore;

/// Builds records for one relation
pub trait RecordBuilder: Send + Sync {
    /// Relation the records belong to
    fn relation(&self) -> &str;

    /// Build, persist and return a record
    fn create(&self, traits: &[String], attrs: AttributeSet) -> FactoryResult<Record>;

    /// Create a record owned by an already persisted parent.
    ///
    /// `foreign_key` was set by the parent's resolver and points back at it;
    /// builders must accept it even when they do not declare it.
    fn create_owned(
        &self,
        traits: &[String],
        attrs: AttributeSet,
        foreign_key: &str,
    ) -> FactoryResult<Record> {
        let _ = foreign_key;
        self.create(traits, attrs)
    }

    /// Build a record without persisting it or its associations
    fn build(&self, traits: &[String], attrs: AttributeSet) -> FactoryResult<Record>;

    /// Builder used for persisting creates
    fn persistable(&self) -> &dyn RecordBuilder;
}

/// Registered factory: definition plus its dispatched association resolvers
pub struct FactoryBuilder {
    name: String,
    relation: String,
    attributes: AttributeDefs,
    traits: Vec<(String, AttributeDefs)>,
    associations: Vec<Association>,
    sequence: Sequence,
    store: Arc<dyn RecordStore>,
    config: FactoryConfig,
}

impl FactoryBuilder {
    pub(crate) fn new(
        parts: DefinitionParts,
        associations: Vec<Association>,
        store: Arc<dyn RecordStore>,
        config: FactoryConfig,
    ) -> Self {
        Self {
            name: parts.name,
            relation: parts.relation,
            attributes: parts.attributes,
            traits: parts.traits,
            associations,
            sequence: Sequence::starting_at(config.sequence_start),
            store,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn association(&self, key: &str) -> Option<&Association> {
        self.associations.iter().find(|assoc| assoc.name() == key)
    }

    /// Defaults, then trait overlays in request order, then overrides.
    ///
    /// `wired` names a foreign key injected by an owning record's resolver.
    fn evaluate(
        &self,
        traits: &[String],
        overrides: &AttributeSet,
        wired: Option<&str>,
    ) -> FactoryResult<AttributeSet> {
        self.check_overrides(overrides, wired)?;

        let overlays = traits
            .iter()
            .map(|trait_name| {
                self.traits
                    .iter()
                    .find(|(name, _)| name == trait_name)
                    .map(|(_, defs)| defs)
                    .ok_or_else(|| FactoryError::UnknownTrait {
                        factory: self.name.clone(),
                        name: trait_name.clone(),
                    })
            })
            .collect::<FactoryResult<Vec<&AttributeDefs>>>()?;

        // only records that get evaluated consume a number
        let n = self.sequence.advance();
        let mut attrs = AttributeSet::new();
        self.attributes.evaluate_into(&mut attrs, n);
        for overlay in overlays {
            overlay.evaluate_into(&mut attrs, n);
        }

        merge(&mut attrs, overrides.clone());
        Ok(attrs)
    }

    fn check_overrides(&self, overrides: &AttributeSet, wired: Option<&str>) -> FactoryResult<()> {
        if !self.config.strict_attributes {
            return Ok(());
        }

        let unknown: Vec<String> = overrides
            .keys()
            .filter(|key| wired != Some(key.as_str()) && !self.is_known_attribute(key))
            .cloned()
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(FactoryError::UnknownAttributes {
                factory: self.name.clone(),
                keys: unknown,
            })
        }
    }

    fn is_known_attribute(&self, key: &str) -> bool {
        key == self.config.primary_key
            || self.attributes.contains(key)
            || self.traits.iter().any(|(_, defs)| defs.contains(key))
            || self.associations.iter().any(|assoc| {
                assoc.name() == key || assoc.descriptor().foreign_key == key
            })
    }

    fn is_association_key(&self, key: &str) -> bool {
        self.associations.iter().any(|assoc| assoc.name() == key)
    }

    fn create_with(
        &self,
        traits: &[String],
        overrides: AttributeSet,
        wired: Option<&str>,
    ) -> FactoryResult<Record> {
        let mut attrs = self.evaluate(traits, &overrides, wired)?;

        // parents first; their keys must be known before the insert
        for assoc in self.associations.iter().filter(|a| !a.dependency_on(&self.relation)) {
            if let Some(fragment) = assoc.call(&attrs, None)? {
                merge(&mut attrs, fragment);
            }
        }

        let mut columns = AttributeSet::new();
        let mut embedded = AttributeSet::new();
        for (key, value) in attrs {
            if self.is_association_key(&key) {
                embedded.insert(key, value);
            } else {
                columns.insert(key, value);
            }
        }

        let persisted = self
            .store
            .insert(&self.relation, columns, &self.config.primary_key)?;
        tracing::debug!("Factory '{}' persisted record in '{}'", self.name, self.relation);

        for assoc in self.associations.iter().filter(|a| a.dependency_on(&self.relation)) {
            let mut own = AttributeSet::new();
            if let Some(value) = overrides.get(assoc.name()) {
                own.insert(assoc.name().to_string(), value.clone());
            }
            if let Some(fragment) = assoc.call(&own, Some(&persisted))? {
                merge(&mut embedded, fragment);
            }
        }

        let mut record = match persisted {
            Value::Object(map) => map,
            other => {
                return Err(FactoryError::Persistence(format!(
                    "Store returned a non-object record for '{}': {}",
                    self.relation, other
                )))
            }
        };
        merge(&mut record, embedded);
        Ok(Value::Object(record))
    }
}

impl RecordBuilder for FactoryBuilder {
    fn relation(&self) -> &str {
        &self.relation
    }

    fn create(&self, traits: &[String], overrides: AttributeSet) -> FactoryResult<Record> {
        self.create_with(traits, overrides, None)
    }

    fn create_owned(
        &self,
        traits: &[String],
        overrides: AttributeSet,
        foreign_key: &str,
    ) -> FactoryResult<Record> {
        self.create_with(traits, overrides, Some(foreign_key))
    }

    fn build(&self, traits: &[String], overrides: AttributeSet) -> FactoryResult<Record> {
        Ok(Value::Object(self.evaluate(traits, &overrides, None)?))
    }

    fn persistable(&self) -> &dyn RecordBuilder {
        self
    }
}
