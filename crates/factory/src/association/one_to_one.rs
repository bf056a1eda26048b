//! One-to-one ("has one") resolver

use super::resolver::{Core, Resolver};
use super::one_to_many::depends_on_source;
use crate::attributes::{AttributeSet, Record};
use crate::error::FactoryResult;

/// Creates exactly one related record once the parent has been persisted
#[derive(Debug)]
pub struct OneToOne {
    core: Core,
}

impl OneToOne {
    pub fn new(core: Core) -> Self {
        Self { core }
    }

    pub fn call(&self, attrs: &AttributeSet, parent: &Record) -> FactoryResult<Option<AttributeSet>> {
        let name = self.name();
        if attrs.contains_key(name) {
            tracing::debug!("Association '{}' keeps supplied value", name);
            return Ok(None);
        }

        let builder = self.resolve_builder()?;
        let descriptor = self.core.descriptor();
        let record = builder.persistable().create_owned(
            self.core.traits(),
            descriptor.associate(attrs, parent),
            &descriptor.foreign_key,
        )?;
        tracing::debug!(
            "Association '{}' created related {} record",
            name,
            descriptor.target_relation
        );

        let mut fragment = AttributeSet::new();
        fragment.insert(name.to_string(), record);
        Ok(Some(fragment))
    }
}

impl Resolver for OneToOne {
    fn core(&self) -> &Core {
        &self.core
    }

    fn dependency_on(&self, relation: &str) -> bool {
        depends_on_source(&self.core, relation)
    }
}
