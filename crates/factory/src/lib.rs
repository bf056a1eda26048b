//! # elif-factory: Test Fixture Factories for elif.rs
//!
//! Declarative factories for building test records, with automatic creation
//! of related records. Associations are resolved in referential order:
//! "belongs to" parents are created before the record that points at them,
//! "has many" and "has one" children after their parent has been persisted.
//!
//! ```ignore
//! use elif_factory::prelude::*;
//! use serde_json::json;
//!
//! let registry = FactoryRegistry::new();
//! registry.define(FactoryDefinition::new("user", "users").attribute("name", "Jane"))?;
//! registry.define(
//!     FactoryDefinition::new("post", "posts")
//!         .attribute("title", "Hello")
//!         .association(AssociationDecl::belongs_to("author", "users").factory("user")),
//! )?;
//!
//! let post = registry.create("post", &[], json!({}))?;
//! assert_eq!(post["author_id"], post["author"]["id"]);
//! ```

pub mod association;
pub mod attributes;
pub mod builder;
pub mod config;
pub mod definition;
pub mod error;
pub mod logging;
pub mod registry;
pub mod store;

pub use association::{
    Association, AssociationDescriptor, AssociationKind, AssociationOptions, BuilderRef, ManyToOne,
    OneToMany, OneToOne, Resolver,
};
pub use attributes::{AttributeDef, AttributeSet, Record};
pub use builder::{FactoryBuilder, RecordBuilder};
pub use config::{factory_config, set_factory_config, FactoryConfig};
pub use definition::{AssociationDecl, FactoryDefinition, TraitDefinition};
pub use error::{FactoryError, FactoryResult};
pub use logging::{init_logging, LoggingConfig};
pub use registry::{factories, to_attributes, FactoryRegistry};
pub use store::{MemoryStore, RecordStore};

pub mod prelude {
    pub use crate::{
        AssociationDecl, AssociationDescriptor, AssociationKind, FactoryConfig, FactoryDefinition,
        FactoryError, FactoryRegistry, FactoryResult, RecordBuilder,
    };
}
