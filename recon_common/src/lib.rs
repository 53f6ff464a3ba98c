mod cents;
mod helpers;

pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError};
pub use helpers::{normalize_name, parse_boolean_flag};
pub use secret::Secret;
