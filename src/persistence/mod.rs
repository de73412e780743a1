//! State persistence
//!
//! - `FileStateStore`: the JSON document on disk
//! - `StateActor` / `StateHandle`: serialized read-modify-write access to it

pub mod state_actor;
pub mod state_store;

pub use state_actor::{StateActor, StateHandle};
pub use state_store::FileStateStore;
