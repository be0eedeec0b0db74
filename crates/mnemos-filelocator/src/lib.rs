//! OS-level fast file finder abstraction (spec.md §4.C4): query by path
//! prefix, name pattern, or content substring, with an `-n N` limit.

pub mod locator;
pub mod query;

pub use locator::FileLocator;
pub use query::{ParsedQuery, QueryInput};
