//! Data models for the settings backend.
//!
//! Field names follow the camelCase shape the settings UI already consumes.

mod collective;
mod contribution;
mod notification;
mod payment_method;

pub use collective::*;
pub use contribution::*;
pub use notification::*;
pub use payment_method::*;
