//! API request handlers.

pub mod automation;
pub mod debug;
pub mod health;

pub use automation::*;
pub use debug::*;
pub use health::*;
