use crate::error::StmtMgrError;
use sqlx::any::{Any, AnyArguments, AnyStatement};
use sqlx::query::Query;
use sqlx::{AnyPool, Statement};
use std::collections::HashMap;
use std::sync::Arc;

/// A prepared statement handed out by the manager.
///
/// Cheap to clone. Carries the pool it was prepared on so callers can execute it
/// without holding a separate connection handle.
#[derive(Clone)]
pub struct PreparedStmt {
    name: Arc<str>,
    statement: Arc<AnyStatement<'static>>,
    pool: AnyPool,
}

impl PreparedStmt {
    pub(crate) fn new(name: &str, statement: AnyStatement<'static>, pool: AnyPool) -> Self {
        Self {
            name: Arc::from(name),
            statement: Arc::new(statement),
            pool,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql(&self) -> &str {
        self.statement.sql()
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Bindable query for this statement; execute it against [`PreparedStmt::pool`].
    pub fn query(&self) -> Query<'_, Any, AnyArguments<'_>> {
        self.statement.query()
    }
}

impl std::fmt::Debug for PreparedStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStmt")
            .field("name", &self.name)
            .field("sql", &self.sql())
            .finish()
    }
}

/// Name -> statement map. Entries are added once; re-registering a name is rejected.
#[derive(Debug)]
pub struct StmtRegistry<S> {
    stmts: HashMap<String, S>,
}

impl<S> Default for StmtRegistry<S> {
    fn default() -> Self {
        Self {
            stmts: HashMap::new(),
        }
    }
}

impl<S: Clone> StmtRegistry<S> {
    pub fn contains(&self, name: &str) -> bool {
        self.stmts.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<S> {
        self.stmts.get(name).cloned()
    }

    /// Inserts `stmt` under `name`; an existing entry is left untouched.
    pub fn insert(&mut self, name: &str, stmt: S) -> Result<(), StmtMgrError> {
        if self.contains(name) {
            return Err(StmtMgrError::DuplicateStatement(name.to_string()));
        }
        self.stmts.insert(name.to_string(), stmt);
        Ok(())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stmts.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

/// State owned exclusively by the store actor.
pub(crate) struct Store {
    pub(crate) pool: Option<AnyPool>,
    pub(crate) registry: StmtRegistry<PreparedStmt>,
}

impl Store {
    pub(crate) fn new() -> Self {
        Self {
            pool: None,
            registry: StmtRegistry::default(),
        }
    }

    pub(crate) fn pool(&self) -> Result<&AnyPool, StmtMgrError> {
        self.pool.as_ref().ok_or(StmtMgrError::NotConnected)
    }

    /// Duplicate check runs before prepare so a conflicting name never reaches the database.
    pub(crate) async fn add_stmt(&mut self, name: &str, query: &str) -> Result<(), StmtMgrError> {
        if self.registry.contains(name) {
            return Err(StmtMgrError::DuplicateStatement(name.to_string()));
        }
        let pool = self.pool()?.clone();
        let prepared = prepare(&pool, query)
            .await
            .map_err(|source| StmtMgrError::PrepareFailed {
                name: name.to_string(),
                source,
            })?;
        self.registry
            .insert(name, PreparedStmt::new(name, prepared, pool))
    }

    pub(crate) fn get_stmt(&self, name: &str) -> Result<PreparedStmt, StmtMgrError> {
        self.registry
            .get(name)
            .ok_or_else(|| StmtMgrError::StatementNotFound(name.to_string()))
    }
}

async fn prepare(pool: &AnyPool, query: &str) -> Result<AnyStatement<'static>, sqlx::Error> {
    use sqlx::Executor;

    let statement = pool.prepare(query).await?;
    Ok(Statement::to_owned(&statement))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_after_insert() {
        let mut registry: StmtRegistry<&'static str> = StmtRegistry::default();
        assert!(!registry.contains("test_query"));
        registry.insert("test_query", "SELECT 1").unwrap();
        assert!(registry.contains("test_query"));
        assert_eq!(registry.get("test_query"), Some("SELECT 1"));
    }

    #[test]
    fn insert_never_overwrites() {
        let mut registry: StmtRegistry<&'static str> = StmtRegistry::default();
        registry.insert("ins", "first").unwrap();

        let err = registry.insert("ins", "second").unwrap_err();
        assert!(matches!(err, StmtMgrError::DuplicateStatement(ref n) if n == "ins"));
        assert_eq!(registry.get("ins"), Some("first"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_is_exact() {
        let mut registry: StmtRegistry<u8> = StmtRegistry::default();
        registry.insert("Insert", 1).unwrap();
        assert_eq!(registry.get("insert"), None);
        assert_eq!(registry.get("Insert "), None);
    }

    #[test]
    fn names_are_sorted() {
        let mut registry: StmtRegistry<u8> = StmtRegistry::default();
        for name in ["truncate", "insert", "delete"] {
            registry.insert(name, 0).unwrap();
        }
        assert_eq!(registry.names(), vec!["delete", "insert", "truncate"]);
    }

    #[test]
    fn store_without_pool_is_not_connected() {
        let store = Store::new();
        assert!(matches!(store.pool(), Err(StmtMgrError::NotConnected)));
        assert!(store.registry.is_empty());
    }
}
