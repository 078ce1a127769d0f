//! Payment method selection for recurring contributions.

mod options;
mod selector;

pub use selector::*;
