//! # relmap
//!
//! Schema-driven change-sets, predicate trees, nested join planning and row
//! scanning for plain Rust entities, executed against SQLite.
//!
//! ```no_run
//! # use relmap::prelude::*;
//! # #[derive(Debug, Default)] struct Widget { id: i64, name: String }
//! # impl Entity for Widget {
//! #     const NAME: &'static str = "Widget";
//! #     fn schema() -> &'static Schema<Self> { unimplemented!() }
//! # }
//! # fn main() -> relmap::Result<()> {
//! let repo = Repo::in_memory()?;
//! repo.execute_batch("CREATE TABLE widgets (Id INTEGER PRIMARY KEY, Name TEXT NOT NULL)")?;
//!
//! let token = CancellationToken::new();
//! let mut widget = Widget::default();
//! let mut cs = ChangeSet::cast_values(&mut widget, repo.registry(), Fields::new().set("Name", "lamp"))?;
//! repo.save(&token, &mut cs)?;
//!
//! let widgets: Vec<Widget> = repo.query(&token, &QueryBuilder::for_entity::<Widget>())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! | Feature    | Default | Enables                                   |
//! |------------|---------|-------------------------------------------|
//! | `rusqlite` | yes     | [`Repo`] and transaction scopes           |
//! | `tracing`  | yes     | statement and transaction events          |

pub mod cache;
pub mod config;
#[cfg(feature = "rusqlite")]
pub mod repo;
#[cfg(feature = "rusqlite")]
mod rows;

pub use relmap_core::*;

pub use cache::EntityCache;
pub use config::{ConfigError, Isolation, RepoConfig};
#[cfg(feature = "rusqlite")]
pub use repo::{Repo, Tx};
pub use tokio_util::sync::CancellationToken;

pub mod prelude {
    pub use relmap_core::prelude::*;

    pub use crate::cache::EntityCache;
    pub use crate::config::{Isolation, RepoConfig};
    #[cfg(feature = "rusqlite")]
    pub use crate::repo::{Repo, Tx};
    pub use tokio_util::sync::CancellationToken;
}
