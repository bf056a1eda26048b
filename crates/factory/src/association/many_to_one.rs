//! Many-to-one ("belongs to") resolver

use super::resolver::{Core, Resolver};
use crate::attributes::{is_present, AttributeSet};
use crate::error::FactoryResult;

/// Ensures a single referenced record exists before the owning record is persisted
#[derive(Debug)]
pub struct ManyToOne {
    core: Core,
}

impl ManyToOne {
    pub fn new(core: Core) -> Self {
        Self { core }
    }

    pub fn foreign_key(&self) -> &str {
        &self.core.descriptor().foreign_key
    }

    /// Resolve the association against the owning record's attributes.
    ///
    /// An explicit foreign key always wins. A supplied related record is wired
    /// in as-is; otherwise one related record is created.
    pub fn call(&self, attrs: &AttributeSet) -> FactoryResult<Option<AttributeSet>> {
        let name = self.name();
        let descriptor = self.core.descriptor();

        if is_present(attrs, self.foreign_key()) {
            tracing::debug!(
                "Association '{}' keeps explicit '{}'",
                name,
                self.foreign_key()
            );
            return Ok(None);
        }

        if let Some(existing) = attrs.get(name) {
            tracing::debug!("Association '{}' wiring supplied record", name);
            return Ok(Some(descriptor.associate(attrs, existing)));
        }

        let builder = self.resolve_builder()?;
        let record = builder
            .persistable()
            .create(self.core.traits(), AttributeSet::new())?;
        tracing::debug!(
            "Association '{}' created related {} record",
            name,
            descriptor.target_relation
        );

        let mut tuple = AttributeSet::new();
        tuple.insert(name.to_string(), record.clone());
        Ok(Some(descriptor.associate(&tuple, &record)))
    }
}

impl Resolver for ManyToOne {
    fn core(&self) -> &Core {
        &self.core
    }
}
