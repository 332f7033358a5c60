//! Core order types for the orderflow service.
//!
//! - [`Order`] and its parts mirror the JSON wire format consumed from the stream.
//! - [`OrderValidator`] is the semantic acceptance gate applied after decoding.
//! - [`sample`] builds well-formed orders for publishing tools and tests.

pub mod error;
pub mod order;
pub mod sample;
pub mod validation;

pub use error::{CoreError, Result};
pub use order::{Delivery, Item, Order, Payment};
pub use validation::{FieldViolation, OrderValidator, Rule, ValidationError};
