//! Trace events for rendered statements, write transactions, dropped
//! change-set values and row scans.
//!
//! With the `tracing` feature off every macro expands to nothing, so the
//! statement generators and the repository call them unconditionally.

/// Debug event carrying a rendered statement and its bound argument count.
///
/// Emitted by `insert_query`, `update_query` and `delete_query` once the
/// statement is built, and by the repository before it prepares one.
///
/// ```ignore
/// let (sql, args) = sql.build();
/// relmap_trace_query!(&sql, args.len());
/// ```
#[macro_export]
macro_rules! relmap_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %$sql, params = $param_count, "relmap.query");
    };
}

/// Info event for a `Repo::transaction` step: `begin`, `commit` or `rollback`.
///
/// ```ignore
/// relmap_trace_tx!("commit", "sqlite.rusqlite");
/// ```
#[macro_export]
macro_rules! relmap_trace_tx {
    ($event:literal, $driver:literal) => {
        #[cfg(feature = "tracing")]
        tracing::info!(event = $event, driver = $driver, "relmap.tx");
    };
}

/// Emit a debug-level event for a value the change-set builder chose to drop.
#[macro_export]
macro_rules! relmap_trace_dropped {
    ($entity:expr, $column:expr, $len:expr, $max:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            entity = $entity,
            column = $column,
            len = $len,
            max = $max,
            "relmap.changeset.dropped"
        );
    };
}

/// Emit a debug-level event once a scan has materialized its entities.
#[macro_export]
macro_rules! relmap_trace_scan {
    ($entity:expr, $rows:expr, $entities:expr) => {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            entity = $entity,
            rows = $rows,
            entities = $entities,
            "relmap.scan"
        );
    };
}
