//! One-to-many ("has many") resolver

use serde_json::Value;

use super::resolver::{Core, Resolver};
use crate::attributes::{AttributeSet, Record};
use crate::error::FactoryResult;

/// Creates `count` related records once the parent has been persisted
#[derive(Debug)]
pub struct OneToMany {
    core: Core,
}

impl OneToMany {
    pub fn new(core: Core) -> Self {
        Self { core }
    }

    /// Configured cardinality; there is no implicit default
    pub fn count(&self) -> FactoryResult<usize> {
        self.core.require_count()
    }

    pub fn call(&self, attrs: &AttributeSet, parent: &Record) -> FactoryResult<Option<AttributeSet>> {
        let name = self.name();
        if attrs.contains_key(name) {
            tracing::debug!("Association '{}' keeps supplied value", name);
            return Ok(None);
        }

        let count = self.count()?;
        let builder = self.resolve_builder()?;
        let descriptor = self.core.descriptor();
        let child_attrs = descriptor.associate(attrs, parent);

        let records = (0..count)
            .map(|_| {
                builder.persistable().create_owned(
                    self.core.traits(),
                    child_attrs.clone(),
                    &descriptor.foreign_key,
                )
            })
            .collect::<FactoryResult<Vec<Record>>>()?;
        tracing::debug!(
            "Association '{}' created {} related {} record(s)",
            name,
            records.len(),
            descriptor.target_relation
        );

        let mut fragment = AttributeSet::new();
        fragment.insert(name.to_string(), Value::Array(records));
        Ok(Some(fragment))
    }
}

impl Resolver for OneToMany {
    fn core(&self) -> &Core {
        &self.core
    }

    fn dependency_on(&self, relation: &str) -> bool {
        depends_on_source(&self.core, relation)
    }
}

/// Dependent associations wait for records of their source relation
pub(super) fn depends_on_source(core: &Core, relation: &str) -> bool {
    core.descriptor().source_relation == relation
}
