//! Postgres wire protocol frontend.
//!
//! # Examples
//!
//! Extended query through the query API:
//!
//! ```no_run
//! use postwire::Connection;
//!
//! # async fn app() -> postwire::Result<()> {
//! let mut conn = Connection::connect_env().await?;
//!
//! let res = postwire::query::<_, (i32,String)>("SELECT 420,$1", &mut conn)
//!     .bind("Foo")
//!     .fetch_one()
//!     .await?;
//!
//! assert_eq!(res.0,420);
//! assert_eq!(res.1.as_str(),"Foo");
//! # Ok(())
//! # }
//! ```
//!
//! Listen and notify:
//!
//! ```no_run
//! use postwire::Connection;
//!
//! # async fn app() -> postwire::Result<()> {
//! let mut conn = Connection::connect_env().await?;
//!
//! conn.listen("events", |n| println!("{}: {}", n.channel, n.payload)).await?;
//! conn.notify("events", "hello").await?;
//!
//! // dispatch incoming notifications until the connection fails
//! conn.drive_notifications().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The [`postgres`] module contains the runtime agnostic message codec, it can be used without
//! [`Connection`], e.g. to build a test server or a proxy.

pub mod common;
mod net;
mod ext;

// Protocol
pub mod postgres;

// Encoding
pub mod value;
pub mod types;

// Component
mod statement;
pub mod sql;
pub mod row;

// Operation
pub mod connection;
pub mod query;

pub mod error;

pub use value::WireValue;
pub use types::{Decode, Encode, Value};
pub use postgres::PgType;
pub use row::{ColumnKey, FromRow, Row, RowResult};
pub use sql::SqlExt;
pub use statement::{Statement, StatementName};

pub use connection::{Config, Connection, StartupConfig, TlsMode};
#[doc(inline)]
pub use query::{execute, query, query_row};
pub use error::{Error, ErrorKind, Result};

#[cfg(feature = "macros")]
pub use postwire_macros::{Decode, Encode, FromRow, PgType};
