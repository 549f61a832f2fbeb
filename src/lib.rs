//! Single-writer task queue for SQLite.
//!
//! An embedded database that does not tolerate concurrent writers can be shared by any number
//! of callers through a [`TaskQueue`]: callers submit closures, receive a [`Ticket`], and later
//! collect the result. One worker thread owns the only `rusqlite::Connection` and runs the
//! closures strictly in ticket order.
//!
//! ```rust,no_run
//! use sqlite_task_queue::prelude::*;
//!
//! # async fn demo() -> Result<(), TaskQueueError> {
//! let queue = TaskQueue::open_in_memory()?;
//! queue.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)").await?;
//!
//! let ticket = queue.submit(|conn| {
//!     Ok(conn.execute("INSERT INTO users (name) VALUES (?1)", ["alice"])?)
//! })?;
//! let inserted: usize = queue.await_result(ticket).await?;
//! assert_eq!(inserted, 1);
//!
//! // The same queue through the connection/statement adapter.
//! let db = open_db(&queue, AdapterOptions::default().with_foreign_keys()).await?;
//! let mut rows = db.query("SELECT name FROM users", &[]).await?;
//! let mut dest = vec![RowValues::Null];
//! while rows.next(&mut dest)? == Next::Row {
//!     println!("{:?}", dest[0]);
//! }
//! queue.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod conn_string;
pub mod driver;
pub mod error;
pub mod params;
pub mod prelude;
pub mod queue;
pub mod results;
pub mod types;

pub use adapter::{AdapterOptions, QueuedDb, open_db};
pub use config::{QueueOptions, QueueOptionsBuilder, Storage};
pub use error::TaskQueueError;
pub use queue::{TaskQueue, Ticket};
pub use results::{QueryRow, ResultSet};
pub use types::RowValues;

pub use rusqlite;
