//! Telemetry configuration model.
//!
//! Builds an in-memory `openconfig-telemetry` configuration tree (sensor groups,
//! sensor paths, subscriptions and their sensor profiles), validates it against a
//! fixed schema, and renders it as a deterministic RFC 7951 JSON_IETF document.
//!
//! - [`schema`] - Fixed registry of entity definitions and leaf constraints
//! - [`tree`] - Typed configuration entities
//! - [`builder`] - Construction of validated trees from plain specs
//! - [`encoder`] - Schema-ordered wire encoding
//! - [`reference`] - Built-in reference configuration

pub mod builder;
pub mod encoder;
pub mod error;
pub mod reference;
pub mod schema;
pub mod tree;

pub use builder::{GroupSpec, SubscriptionSpec, TreeBuilder, build};
pub use encoder::{Encoding, Payload, encode, encode_pretty};
pub use error::{EncodeError, ValidationError};
pub use schema::{EntityDef, EntityKind, LeafDef, LeafType, Schema};
pub use tree::{
    ConfigurationTree, SensorGroup, SensorPath, SensorProfile, Subscription, SubscriptionId,
};
