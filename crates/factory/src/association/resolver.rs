//! State shared by every association resolver

use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::descriptor::AssociationDescriptor;
use crate::builder::RecordBuilder;
use crate::error::{FactoryError, FactoryResult};

/// Deferred reference to the builder for the related relation.
///
/// Two factories may point at each other, so the related builder is only
/// looked up the first time a resolver runs.
pub type BuilderRef = Box<dyn Fn() -> FactoryResult<Arc<dyn RecordBuilder>> + Send + Sync>;

/// Per-association options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationOptions {
    /// Number of related records to create for one-to-many associations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl AssociationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

/// Common resolver state: descriptor, lazily resolved builder, traits and options
///
/// The resolved builder is cached as a `Weak`. Builders of mutually
/// associated factories would otherwise keep each other alive.
pub struct Core {
    descriptor: AssociationDescriptor,
    builder_ref: BuilderRef,
    builder: OnceCell<Weak<dyn RecordBuilder>>,
    traits: Vec<String>,
    options: AssociationOptions,
}

impl Core {
    pub fn new(
        descriptor: AssociationDescriptor,
        builder_ref: BuilderRef,
        traits: Vec<String>,
        options: AssociationOptions,
    ) -> Self {
        Self {
            descriptor,
            builder_ref,
            builder: OnceCell::new(),
            traits,
            options,
        }
    }

    pub fn descriptor(&self) -> &AssociationDescriptor {
        &self.descriptor
    }

    pub fn traits(&self) -> &[String] {
        &self.traits
    }

    pub fn options(&self) -> &AssociationOptions {
        &self.options
    }

    /// Attribute this resolver populates
    pub fn name(&self) -> &str {
        &self.descriptor.key
    }

    /// The related builder, resolved on first use and cached afterwards
    pub fn resolve_builder(&self) -> FactoryResult<Arc<dyn RecordBuilder>> {
        if let Some(builder) = self.builder.get().and_then(Weak::upgrade) {
            return Ok(builder);
        }

        tracing::debug!(
            "Resolving builder for association '{}' -> {}",
            self.descriptor.key,
            self.descriptor.target_relation
        );
        let builder = (self.builder_ref)()?;
        // a failed set means the first cached builder was dropped; keep serving fresh lookups
        let _ = self.builder.set(Arc::downgrade(&builder));
        Ok(builder)
    }

    /// Whether a resolved builder is cached and still alive
    pub fn is_resolved(&self) -> bool {
        self.builder
            .get()
            .map_or(false, |builder| builder.strong_count() > 0)
    }

    pub(crate) fn require_count(&self) -> FactoryResult<usize> {
        self.options.count.ok_or_else(|| FactoryError::MissingOption {
            key: self.descriptor.key.clone(),
            option: "count",
        })
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("descriptor", &self.descriptor)
            .field("traits", &self.traits)
            .field("options", &self.options)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Shared resolver contract
pub trait Resolver {
    fn core(&self) -> &Core;

    fn name(&self) -> &str {
        self.core().name()
    }

    /// Whether this resolver may only run once records of `relation` exist
    fn dependency_on(&self, _relation: &str) -> bool {
        false
    }

    /// Reserved for associations that resolve to a scalar rather than a record
    fn is_value(&self) -> bool {
        false
    }

    fn resolve_builder(&self) -> FactoryResult<Arc<dyn RecordBuilder>> {
        self.core().resolve_builder()
    }
}
