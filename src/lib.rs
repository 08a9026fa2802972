pub mod config;
pub mod error;
pub mod manager;
pub mod utils;

pub use config::ConnectionConfig;
pub use error::{ErrorKind, StmtMgrError};
pub use manager::{ManagerOptions, PreparedStmt, StmtManager};
