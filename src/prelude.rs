//! Convenient imports for common functionality.

pub use crate::adapter::{
    AdapterOptions, QueuedConnection, QueuedDb, QueuedDriver, QueuedRows, QueuedStatement,
    QueuedTx, open_db,
};
pub use crate::config::{QueueOptions, QueueOptionsBuilder, Storage};
pub use crate::conn_string::ConnectionString;
pub use crate::driver::{Conn, Driver, ExecSummary, Next, Rows, Stmt, Tx};
pub use crate::error::TaskQueueError;
pub use crate::queue::{TaskQueue, Ticket};
pub use crate::results::{QueryRow, ResultSet};
pub use crate::types::RowValues;
