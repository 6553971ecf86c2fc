//! `stockledger-core`: foundation building blocks shared by every crate.
//!
//! This crate contains **pure** primitives (no infrastructure concerns):
//! identifiers, the entity/value-object vocabulary and the error model.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::{Entity, sort_by_id};
pub use error::{LedgerError, LedgerResult};
pub use id::{MovementId, ProductId};
pub use value_object::ValueObject;
