//! rusqlite-backed repository.
//!
//! Statements run either one at a time against the shared connection or
//! inside an explicit [`Repo::transaction`] scope. Every operation takes a
//! [`CancellationToken`] that is checked before each round-trip.

use crate::config::{Isolation, RepoConfig};
use crate::rows::SqliteRows;
use relmap_core::changeset::{Action, ChangeSet};
use relmap_core::error::{ErrorKind, MapError, Result};
use relmap_core::predicate::Predicate;
use relmap_core::query::QueryBuilder;
use relmap_core::query::join::JoinPlanner;
use relmap_core::registry::SchemaRegistry;
use relmap_core::scan::RowScanner;
use relmap_core::schema::Entity;
use relmap_core::statement::{delete_query, insert_query, update_query};
use relmap_core::value::Value;
use rusqlite::{Connection, params_from_iter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

const NOT_FOUND_ID: &str = "Error Update Custom: Not Found Id";

fn ensure_live(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(MapError::Cancelled);
    }
    Ok(())
}

/// Statement execution shared by the repository and transaction handles.
struct Session<'c> {
    conn: &'c Connection,
    registry: &'c SchemaRegistry,
    debug: bool,
}

impl Session<'_> {
    fn log(&self, sql: &str, params: usize) {
        relmap_core::relmap_trace_query!(sql, params);
        if self.debug {
            #[cfg(feature = "tracing")]
            tracing::info!(sql = %sql, params, "relmap.debug");
        }
    }

    fn execute(&self, token: &CancellationToken, sql: &str, params: &[Value]) -> Result<usize> {
        ensure_live(token)?;
        self.log(sql, params.len());
        Ok(self.conn.execute(sql, params_from_iter(params))?)
    }

    fn save(&self, token: &CancellationToken, cs: &mut ChangeSet<'_>) -> Result<()> {
        cs.ensure_valid_insert()?;
        let (sql, params) = insert_query(cs)?;
        self.execute(token, &sql, &params)?;
        if cs.has_generated_key() {
            cs.write_back_key(Value::Integer(self.conn.last_insert_rowid()))?;
        }
        cs.mark(Action::Insert);
        Ok(())
    }

    fn update_by_id(
        &self,
        token: &CancellationToken,
        cs: &mut ChangeSet<'_>,
        extra: Option<&Predicate>,
    ) -> Result<()> {
        let (sql, params) = update_query(cs, extra)?;
        if self.execute(token, &sql, &params)? == 0 {
            return Err(MapError::not_found(
                cs.entity(),
                ErrorKind::TargetNotFound,
                format!("{NOT_FOUND_ID} {}", cs.primary_key()),
            ));
        }
        cs.mark(Action::Update);
        Ok(())
    }

    fn delete_by_id(&self, token: &CancellationToken, cs: &mut ChangeSet<'_>) -> Result<()> {
        let (sql, params) = delete_query(cs)?;
        if self.execute(token, &sql, &params)? == 0 {
            return Err(MapError::not_found(
                cs.entity(),
                ErrorKind::TargetNotFound,
                format!("{NOT_FOUND_ID} {}", cs.primary_key()),
            ));
        }
        cs.mark(Action::Delete);
        Ok(())
    }

    fn fetch<E: Entity>(
        &self,
        token: &CancellationToken,
        sql: &str,
        params: &[Value],
        ordered: bool,
    ) -> Result<Vec<E>> {
        ensure_live(token)?;
        self.log(sql, params.len());

        let mut stmt = self.conn.prepare(sql)?;
        let columns = stmt
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect();
        let rows = stmt.query(params_from_iter(params))?;
        let mut source = SqliteRows::new(columns, rows);
        RowScanner::new(self.registry)
            .ordered(ordered)
            .scan(&mut source)
    }

    fn query<E: Entity>(&self, token: &CancellationToken, builder: &QueryBuilder) -> Result<Vec<E>> {
        let (sql, params) = builder.build();
        self.fetch(token, &sql, &params, builder.is_ordered())
    }

    fn query_join<E: Entity>(
        &self,
        token: &CancellationToken,
        planner: &JoinPlanner,
    ) -> Result<Vec<E>> {
        let (sql, params) = planner.build()?;
        self.fetch(token, &sql, &params, planner.is_ordered())
    }
}

/// Shared handle to one SQLite database.
#[derive(Debug)]
pub struct Repo {
    conn: Mutex<Connection>,
    registry: Arc<SchemaRegistry>,
    isolation: Isolation,
    debug: bool,
}

impl Repo {
    /// Opens the database described by `config`; in-memory when no path is set.
    pub fn open(config: &RepoConfig) -> Result<Self> {
        let conn = match &config.database.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        Self::new(conn, config)
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(&RepoConfig::default())
    }

    pub fn new(conn: Connection, config: &RepoConfig) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", config.database.foreign_keys)?;
        Ok(Self {
            conn: Mutex::new(conn),
            registry: Arc::new(SchemaRegistry::new()),
            isolation: config.database.isolation,
            debug: config.database.debug,
        })
    }

    /// Uses an existing registry, e.g. one shared with request handlers.
    pub fn with_registry(mut self, registry: Arc<SchemaRegistry>) -> Self {
        self.registry = registry;
        self
    }

    #[inline]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    #[inline]
    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_session<R>(&self, f: impl FnOnce(&Session<'_>) -> Result<R>) -> Result<R> {
        let conn = self.lock();
        f(&Session {
            conn: &conn,
            registry: &self.registry,
            debug: self.debug,
        })
    }

    /// Runs a batch of statements without arguments, e.g. table definitions.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Inserts the change-set's row and writes a generated key back into it.
    pub fn save(&self, token: &CancellationToken, cs: &mut ChangeSet<'_>) -> Result<()> {
        self.with_session(|s| s.save(token, cs))
    }

    /// Updates the row keyed by the change-set's primary key.
    pub fn update_by_id(
        &self,
        token: &CancellationToken,
        cs: &mut ChangeSet<'_>,
        extra: Option<&Predicate>,
    ) -> Result<()> {
        self.with_session(|s| s.update_by_id(token, cs, extra))
    }

    pub fn delete_by_id(&self, token: &CancellationToken, cs: &mut ChangeSet<'_>) -> Result<()> {
        self.with_session(|s| s.delete_by_id(token, cs))
    }

    /// Scans the rows of an arbitrary statement into entities, in no
    /// particular order.
    pub fn raw_query<E: Entity>(
        &self,
        token: &CancellationToken,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<E>> {
        self.with_session(|s| s.fetch(token, sql, params, false))
    }

    /// Like [`Repo::raw_query`], keeping entities in the order their keys
    /// first appear in the result.
    pub fn raw_query_ordered<E: Entity>(
        &self,
        token: &CancellationToken,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<E>> {
        self.with_session(|s| s.fetch(token, sql, params, true))
    }

    pub fn query<E: Entity>(
        &self,
        token: &CancellationToken,
        builder: &QueryBuilder,
    ) -> Result<Vec<E>> {
        self.with_session(|s| s.query(token, builder))
    }

    pub fn query_join<E: Entity>(
        &self,
        token: &CancellationToken,
        planner: &JoinPlanner,
    ) -> Result<Vec<E>> {
        self.with_session(|s| s.query_join(token, planner))
    }

    /// Runs `f` inside a transaction opened with the configured isolation.
    ///
    /// The transaction commits when `f` returns `Ok` and the token is still
    /// live. An `Err`, a cancelled token or a panic rolls it back.
    ///
    /// The connection stays locked while `f` runs, so `f` must go through
    /// the [`Tx`] it is given. Calling back into this `Repo` deadlocks.
    pub fn transaction<F, R>(&self, token: &CancellationToken, f: F) -> Result<R>
    where
        F: FnOnce(&Tx<'_>) -> Result<R>,
    {
        ensure_live(token)?;
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(self.isolation.into())?;
        relmap_core::relmap_trace_tx!("begin", "sqlite.rusqlite");

        let handle = Tx {
            tx,
            registry: &self.registry,
            token: token.clone(),
            debug: self.debug,
        };

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&handle)));

        match result {
            Ok(Ok(value)) if !token.is_cancelled() => {
                handle.tx.commit()?;
                relmap_core::relmap_trace_tx!("commit", "sqlite.rusqlite");
                Ok(value)
            }
            Ok(Ok(_)) => {
                rollback(handle.tx);
                Err(MapError::Cancelled)
            }
            Ok(Err(e)) => {
                rollback(handle.tx);
                Err(e)
            }
            Err(panic_payload) => {
                rollback(handle.tx);
                std::panic::resume_unwind(panic_payload);
            }
        }
    }
}

/// Rolls back, logging a failure instead of masking the error that caused it.
fn rollback(tx: rusqlite::Transaction<'_>) {
    if let Err(_err) = tx.rollback() {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %_err, "relmap.tx: rollback failed");
    }
    relmap_core::relmap_trace_tx!("rollback", "sqlite.rusqlite");
}

/// Transaction scope handed to the [`Repo::transaction`] callback.
///
/// Every statement checks the scope's cancellation token first.
pub struct Tx<'conn> {
    tx: rusqlite::Transaction<'conn>,
    registry: &'conn SchemaRegistry,
    token: CancellationToken,
    debug: bool,
}

impl Tx<'_> {
    fn session(&self) -> Session<'_> {
        Session {
            conn: &self.tx,
            registry: self.registry,
            debug: self.debug,
        }
    }

    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn save(&self, cs: &mut ChangeSet<'_>) -> Result<()> {
        self.session().save(&self.token, cs)
    }

    pub fn update_by_id(&self, cs: &mut ChangeSet<'_>, extra: Option<&Predicate>) -> Result<()> {
        self.session().update_by_id(&self.token, cs, extra)
    }

    pub fn delete_by_id(&self, cs: &mut ChangeSet<'_>) -> Result<()> {
        self.session().delete_by_id(&self.token, cs)
    }

    pub fn raw_query<E: Entity>(&self, sql: &str, params: &[Value]) -> Result<Vec<E>> {
        self.session().fetch(&self.token, sql, params, false)
    }

    pub fn raw_query_ordered<E: Entity>(&self, sql: &str, params: &[Value]) -> Result<Vec<E>> {
        self.session().fetch(&self.token, sql, params, true)
    }

    pub fn query<E: Entity>(&self, builder: &QueryBuilder) -> Result<Vec<E>> {
        self.session().query(&self.token, builder)
    }

    pub fn query_join<E: Entity>(&self, planner: &JoinPlanner) -> Result<Vec<E>> {
        self.session().query_join(&self.token, planner)
    }
}
