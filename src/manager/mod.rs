//! Statement manager: a single store actor owning the connection pool and the
//! prepared-statement registry.
//!
//! Layout:
//! - `actor.rs`: `StmtManager` handle, `StoreMessage` protocol, the `StoreActor` worker
//! - `store.rs`: `Store`, `StmtRegistry` and the `PreparedStmt` handed to callers

mod actor;
mod store;

pub use actor::{ManagerOptions, StmtManager, StoreMessage};
pub use store::{PreparedStmt, StmtRegistry};
