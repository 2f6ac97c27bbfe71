//! Core invoice types, tax arithmetic, validation, and numbering.
//!
//! This module provides the foundational types for AFIP electronic
//! invoicing: taxpayer configuration, the immutable [`Invoice`] value,
//! the WSFE code tables, and the sequential numbering used by the
//! authorization request builder.

mod builder;
mod error;
mod numbering;
mod tax;
mod types;
mod validation;

pub use builder::*;
pub use error::*;
pub use numbering::*;
pub use types::*;
pub use validation::*;
