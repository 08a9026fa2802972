mod stmtmgr;

pub use stmtmgr::{ErrorKind, StmtMgrError};
