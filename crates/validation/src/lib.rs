//! Typed predicates over item properties.
//!
//! A [`Validation`] checks one property; a [`Filter`] combines validations
//! into an accept/reject decision. Operator behaviour is resolved through a
//! [`ValidationStore`] the host builds once at start-up.

pub mod filter;
pub mod flags;
pub mod operators;
pub mod processor;
pub mod registry;
pub mod validation;

pub use filter::{Filter, FilterBuilder};
pub use flags::{Operator, ValidationFlags, ValidationResult};
pub use operators::{BUILTIN_OPERATORS, FnOperator, ValidationOperator};
pub use processor::{ProcessFailure, ProcessReport, Processor, ProcessorRunner};
pub use registry::ValidationStore;
pub use validation::Validation;
