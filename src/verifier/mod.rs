//! Documentation verification against extracted source facts

pub mod validator;

pub use validator::{DocumentationValidator, ValidationOptions, validate};
