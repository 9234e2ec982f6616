//! Backend abstraction layer
//!
//! Provides the trait every graphics backend implements, the types shared
//! between backends and a recording dummy backend.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::{BackendCall, DrawRecord, DummyBackend};
pub use traits::*;
pub use types::*;
