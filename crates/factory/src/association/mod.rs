//! Association resolution
//!
//! Each declared relationship of a factory is backed by one resolver. The
//! resolver decides whether a related record already exists, has to be
//! created, and whether it must be created before or after the owning record.
//!
//! - [`ManyToOne`] runs before the owning record is persisted and yields the
//!   parent plus its foreign key.
//! - [`OneToMany`] and [`OneToOne`] run after the owning record is persisted
//!   and receive it as the parent.
//!
//! [`Association`] dispatches a descriptor to the matching resolver.

use std::sync::Arc;

pub mod descriptor;
pub mod many_to_one;
pub mod one_to_many;
pub mod one_to_one;
pub mod resolver;

pub use descriptor::{AssociationDescriptor, AssociationKind};
pub use many_to_one::ManyToOne;
pub use one_to_many::OneToMany;
pub use one_to_one::OneToOne;
pub use resolver::{AssociationOptions, BuilderRef, Core, Resolver};

use crate::attributes::{AttributeSet, Record};
use crate::builder::RecordBuilder;
use crate::error::{FactoryError, FactoryResult};

/// A dispatched association resolver
#[derive(Debug)]
pub enum Association {
    ManyToOne(ManyToOne),
    OneToMany(OneToMany),
    OneToOne(OneToOne),
}

impl Association {
    /// Select the resolver for the descriptor's kind
    pub fn new(
        descriptor: AssociationDescriptor,
        builder_ref: BuilderRef,
        traits: Vec<String>,
        options: AssociationOptions,
    ) -> FactoryResult<Self> {
        descriptor.validate()?;

        let kind = descriptor.kind;
        let key = descriptor.key.clone();
        let core = Core::new(descriptor, builder_ref, traits, options);

        match kind {
            AssociationKind::ManyToOne => Ok(Association::ManyToOne(ManyToOne::new(core))),
            AssociationKind::OneToMany => Ok(Association::OneToMany(OneToMany::new(core))),
            AssociationKind::OneToOne => Ok(Association::OneToOne(OneToOne::new(core))),
            AssociationKind::ManyToMany => {
                Err(FactoryError::UnsupportedAssociationKind { key, kind })
            }
        }
    }

    fn resolver(&self) -> &dyn Resolver {
        match self {
            Association::ManyToOne(r) => r,
            Association::OneToMany(r) => r,
            Association::OneToOne(r) => r,
        }
    }

    pub fn kind(&self) -> AssociationKind {
        self.descriptor().kind
    }

    pub fn descriptor(&self) -> &AssociationDescriptor {
        self.resolver().core().descriptor()
    }

    pub fn name(&self) -> &str {
        self.resolver().name()
    }

    pub fn dependency_on(&self, relation: &str) -> bool {
        self.resolver().dependency_on(relation)
    }

    pub fn is_value(&self) -> bool {
        self.resolver().is_value()
    }

    pub fn resolve_builder(&self) -> FactoryResult<Arc<dyn RecordBuilder>> {
        self.resolver().resolve_builder()
    }

    /// Run the resolver. Dependent kinds require the persisted `parent`.
    pub fn call(
        &self,
        attrs: &AttributeSet,
        parent: Option<&Record>,
    ) -> FactoryResult<Option<AttributeSet>> {
        match self {
            Association::ManyToOne(r) => r.call(attrs),
            Association::OneToMany(r) => r.call(attrs, self.require_parent(parent)?),
            Association::OneToOne(r) => r.call(attrs, self.require_parent(parent)?),
        }
    }

    fn require_parent<'a>(&self, parent: Option<&'a Record>) -> FactoryResult<&'a Record> {
        parent.ok_or_else(|| {
            FactoryError::Configuration(format!(
                "Association '{}' needs a persisted {} parent",
                self.name(),
                self.descriptor().source_relation
            ))
        })
    }
}
