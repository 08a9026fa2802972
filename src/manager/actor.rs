use super::store::{PreparedStmt, Store};
use crate::config::ConnectionConfig;
use crate::error::StmtMgrError;
use ractor::concurrency::JoinHandle;
use ractor::rpc::CallResult;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options that shape a manager's lifecycle rather than its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Close the pool in the actor's `post_stop`.
    pub close_on_shutdown: bool,
    /// Caller-side timeout per call; `None` waits forever.
    pub call_timeout: Option<Duration>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            close_on_shutdown: true,
            call_timeout: None,
        }
    }
}

/// Messages handled by the store actor, processed strictly in mailbox order.
#[derive(Debug)]
pub enum StoreMessage {
    /// Ping `pool` and, on success, make it the store's connection.
    Attach(AnyPool, RpcReplyPort<Result<(), StmtMgrError>>),

    /// Prepare `query` and register it under `name`.
    AddStmt {
        name: String,
        query: String,
        reply: RpcReplyPort<Result<(), StmtMgrError>>,
    },

    /// Look up a registered statement.
    GetStmt(String, RpcReplyPort<Result<PreparedStmt, StmtMgrError>>),

    /// Whether `name` is registered.
    HasStmt(String, RpcReplyPort<bool>),

    /// Sorted list of registered names.
    ListStmts(RpcReplyPort<Vec<String>>),

    /// Stop after every message queued ahead of this one.
    Shutdown,
}

struct Lifecycle {
    closed: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a statement manager. Clones share the same worker and lifecycle.
#[derive(Clone)]
pub struct StmtManager {
    actor: ActorRef<StoreMessage>,
    lifecycle: Arc<Lifecycle>,
    call_timeout: Option<Duration>,
}

impl std::fmt::Debug for StmtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StmtManager")
            .field("actor", &self.actor.get_id())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl StmtManager {
    /// Builds a manager from a raw JSON connection document.
    ///
    /// On any error no manager exists and nothing needs closing: a worker that was
    /// already started is shut down and joined before the error is returned.
    pub async fn new(config: &[u8]) -> Result<Self, StmtMgrError> {
        let cfg = ConnectionConfig::from_slice(config)?;
        Self::from_config(cfg).await
    }

    pub async fn from_reader<R: Read>(mut reader: R) -> Result<Self, StmtMgrError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::new(&buf).await
    }

    pub async fn from_config(cfg: ConnectionConfig) -> Result<Self, StmtMgrError> {
        let resolved = cfg.resolve()?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_lifetime(resolved.max_lifetime)
            .acquire_timeout(resolved.connect_timeout)
            .connect_lazy(resolved.url.as_str())
            .map_err(StmtMgrError::Open)?;

        info!(
            driver = %resolved.driver,
            dsn = %resolved.redacted_dsn(),
            max_lifetime_secs = resolved.max_lifetime.as_secs(),
            "StmtManager opening database"
        );

        Self::with_pool(pool, cfg.manager_options()).await
    }

    /// Hands an already-open pool to a new worker. The pool is still pinged
    /// before the manager is returned.
    pub async fn with_pool(pool: AnyPool, options: ManagerOptions) -> Result<Self, StmtMgrError> {
        let (actor, worker) = Actor::spawn(None, StoreActor, options)
            .await
            .map_err(|e| StmtMgrError::RactorError(format!("failed to spawn StoreActor: {e}")))?;

        let manager = StmtManager {
            actor,
            lifecycle: Arc::new(Lifecycle {
                closed: AtomicBool::new(false),
                worker: Mutex::new(Some(worker)),
            }),
            call_timeout: options.call_timeout,
        };

        // The worker is running from here on; every error path must stop it.
        match manager
            .call("Attach", |reply| StoreMessage::Attach(pool, reply))
            .await
        {
            Ok(Ok(())) => Ok(manager),
            Ok(Err(e)) | Err(e) => {
                // Attach may still be waiting on the pool; Shutdown would queue behind it.
                manager.abort().await;
                Err(e)
            }
        }
    }

    /// Prepares `query` and registers it under `name`.
    pub async fn add_stmt(&self, name: &str, query: &str) -> Result<(), StmtMgrError> {
        if name.is_empty() {
            return Err(StmtMgrError::EmptyName);
        }
        if query.is_empty() {
            return Err(StmtMgrError::EmptyQuery);
        }
        let (name, query) = (name.to_string(), query.to_string());
        self.call("AddStmt", |reply| StoreMessage::AddStmt { name, query, reply })
            .await?
    }

    /// Returns the statement registered under `name`. Executing it is up to the caller.
    pub async fn get_stmt(&self, name: &str) -> Result<PreparedStmt, StmtMgrError> {
        if name.is_empty() {
            return Err(StmtMgrError::EmptyName);
        }
        let name = name.to_string();
        self.call("GetStmt", |reply| StoreMessage::GetStmt(name, reply))
            .await?
    }

    pub async fn has_stmt(&self, name: &str) -> Result<bool, StmtMgrError> {
        if name.is_empty() {
            return Err(StmtMgrError::EmptyName);
        }
        let name = name.to_string();
        self.call("HasStmt", |reply| StoreMessage::HasStmt(name, reply))
            .await
    }

    pub async fn stmt_names(&self) -> Result<Vec<String>, StmtMgrError> {
        self.call("ListStmts", StoreMessage::ListStmts).await
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.closed.load(Ordering::Acquire)
    }

    /// Stops the worker once every command admitted before this call has run,
    /// then waits for it to exit. Only the first call on any clone succeeds.
    pub async fn close(&self) -> Result<(), StmtMgrError> {
        if self.lifecycle.closed.swap(true, Ordering::AcqRel) {
            return Err(StmtMgrError::AlreadyClosed);
        }

        if let Err(e) = ractor::cast!(self.actor, StoreMessage::Shutdown) {
            // Mailbox already gone; the worker has stopped on its own.
            debug!(error = %e, "StoreActor Shutdown cast failed");
        }

        let worker = self.take_worker();
        if let Some(worker) = worker {
            worker
                .await
                .map_err(|e| StmtMgrError::RactorError(format!("StoreActor join failed: {e}")))?;
        }
        Ok(())
    }

    /// Kills the worker without draining its mailbox, then joins it.
    async fn abort(&self) {
        self.lifecycle.closed.store(true, Ordering::Release);
        self.actor.kill();

        let worker = self.take_worker();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!(error = %e, "StoreActor join failed after kill");
            }
        }
    }

    fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.lifecycle
            .worker
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
    }

    async fn call<T, F>(&self, op: &'static str, build: F) -> Result<T, StmtMgrError>
    where
        T: Send + 'static,
        F: FnOnce(RpcReplyPort<T>) -> StoreMessage,
    {
        if self.is_closed() {
            return Err(StmtMgrError::Closed);
        }
        match self.actor.call(build, self.call_timeout).await {
            Ok(CallResult::Success(v)) => Ok(v),
            Ok(CallResult::Timeout) => Err(StmtMgrError::Timeout {
                op,
                after: self.call_timeout.unwrap_or_default(),
            }),
            // Reply port dropped unanswered: the message landed behind Shutdown.
            Ok(CallResult::SenderError) => Err(StmtMgrError::Closed),
            Err(e) if self.is_closed() => {
                debug!(op, error = %e, "StoreActor RPC after close");
                Err(StmtMgrError::Closed)
            }
            Err(e) => Err(StmtMgrError::RactorError(format!(
                "StoreActor {op} RPC failed: {e}"
            ))),
        }
    }
}

struct StoreActorState {
    store: Store,
    close_on_shutdown: bool,
}

struct StoreActor;

#[ractor::async_trait]
impl Actor for StoreActor {
    type Msg = StoreMessage;
    type State = StoreActorState;
    type Arguments = ManagerOptions;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        options: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        debug!(actor = %myself.get_id(), "StoreActor initialized");
        Ok(StoreActorState {
            store: Store::new(),
            close_on_shutdown: options.close_on_shutdown,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            StoreMessage::Attach(pool, reply) => {
                let res = attach(&mut state.store, pool).await;
                let _ = reply.send(res);
            }
            StoreMessage::AddStmt { name, query, reply } => {
                let res = state.store.add_stmt(&name, &query).await;
                match &res {
                    Ok(()) => debug!(name = %name, "statement registered"),
                    Err(e) => warn!(name = %name, error = %e, "statement registration failed"),
                }
                let _ = reply.send(res);
            }
            StoreMessage::GetStmt(name, reply) => {
                let _ = reply.send(state.store.get_stmt(&name));
            }
            StoreMessage::HasStmt(name, reply) => {
                let _ = reply.send(state.store.registry.contains(&name));
            }
            StoreMessage::ListStmts(reply) => {
                let _ = reply.send(state.store.registry.names());
            }
            StoreMessage::Shutdown => {
                myself.stop(Some("shutdown requested".to_string()));
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let registered = state.store.registry.len();
        if let Some(pool) = state.store.pool.take() {
            if state.close_on_shutdown {
                pool.close().await;
                info!(registered, "StoreActor stopped; pool closed");
                return Ok(());
            }
        }
        info!(registered, "StoreActor stopped");
        Ok(())
    }
}

async fn attach(store: &mut Store, pool: AnyPool) -> Result<(), StmtMgrError> {
    use sqlx::Connection;

    let mut conn = pool.acquire().await.map_err(StmtMgrError::Unreachable)?;
    conn.ping().await.map_err(StmtMgrError::Unreachable)?;
    drop(conn);

    store.pool = Some(pool);
    Ok(())
}
