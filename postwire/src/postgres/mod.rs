//! Postgres frontend and backend messages.
//!
//! Every message but the startup family is framed as a type byte, a big endian `i32` length
//! that counts itself but not the type byte, and the body:
//!
//! ```text
//! ┏━━━━┳━━━━━━━━━━━━━━━━━━━┳━━━━━━━━━━━━━━━┓
//! ┃ Ty ┃      Length       ┃     Body      ┃
//! ┣━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━┫
//! ┃ 'Q'┃ 00 | 00 | 00 | 0d ┃ "SELECT 1\0"  ┃
//! ┗━━━━┻━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━┛
//! ```
//!
//! `StartupMessage`, `SSLRequest` and `CancelRequest` have no type byte, they are told apart by
//! the code in place of the protocol version. The answer to `SSLRequest` is one unframed byte.
//!
//! [`codec`] splits frames off a read buffer in both directions, so the same types serve a
//! client, a test server, or a proxy. Values inside `Bind` and `DataRow` are either text or
//! binary, see [`PgFormat`].
//!
//! <https://www.postgresql.org/docs/current/protocol-message-formats.html>

mod pg_type;
mod pg_format;

pub mod frontend;
pub mod backend;
pub mod codec;

mod error;

pub use pg_type::{Oid, PgType, TypeInfo, TypeTable, oid};
pub use pg_format::PgFormat;

pub use frontend::{FrontendMessage, FrontendProtocol};
pub use backend::{BackendMessage, BackendProtocol};
pub use error::{ProtocolError, ServerError};
