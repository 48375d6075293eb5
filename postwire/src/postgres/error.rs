//! Protocol and server errors.
use std::{fmt, str::Utf8Error};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::BackendMessage;
use crate::{common::ByteStr, ext::{BufMutExt, BytesExt}};

/// An error when translating buffer from or to postgres.
///
/// Protocol error is fatal, the connection is closed when one occurs.
pub enum ProtocolError {
    /// Message is not expected in current phase.
    Unexpected {
        expect: Option<u8>,
        found: u8,
        phase: Option<&'static str>,
    },
    /// Unknown message type.
    UnknownMessage {
        msgtype: u8,
    },
    /// Unknown authentication method.
    UnknownAuth {
        auth: i32,
    },
    /// Declared message length is not valid.
    InvalidLength {
        msgtype: u8,
        len: i32,
    },
    /// Message body does not follow the message layout.
    Malformed {
        reason: &'static str,
    },
    /// Postgres string is not valid utf8.
    Utf8(Utf8Error),
}

impl ProtocolError {
    pub(crate) fn unknown(msgtype: u8) -> ProtocolError {
        Self::UnknownMessage { msgtype }
    }

    pub(crate) fn unexpected(expect: u8, found: u8) -> ProtocolError {
        Self::Unexpected { expect: Some(expect), found, phase: None }
    }

    pub(crate) fn unexpected_phase(found: u8, phase: &'static str) -> ProtocolError {
        Self::Unexpected { expect: None, found, phase: Some(phase) }
    }

    pub(crate) fn unknown_auth(auth: i32) -> ProtocolError {
        Self::UnknownAuth { auth }
    }

    pub(crate) fn invalid_length(msgtype: u8, len: i32) -> ProtocolError {
        Self::InvalidLength { msgtype, len }
    }

    pub(crate) fn malformed(reason: &'static str) -> ProtocolError {
        Self::Malformed { reason }
    }

    pub(crate) fn truncated() -> ProtocolError {
        Self::malformed("message body truncated")
    }

    pub(crate) fn unterminated() -> ProtocolError {
        Self::malformed("string is not nul terminated")
    }

    pub(crate) fn trailing() -> ProtocolError {
        Self::malformed("message body has trailing bytes")
    }

    pub(crate) fn utf8(err: Utf8Error) -> ProtocolError {
        Self::Utf8(err)
    }
}

impl std::error::Error for ProtocolError { }

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProtocolError::Unexpected { expect, found, phase } => {
                let found = BackendMessage::message_name(found);
                match expect {
                    Some(m) => write!(
                        f,
                        "expected message `{}` found `{found}`",
                        BackendMessage::message_name(m),
                    )?,
                    None => write!(f, "unexpected message `{found}`")?,
                }
                if let Some(phase) = phase {
                    write!(f, " in `{phase}`")?
                }
                Ok(())
            },
            ProtocolError::UnknownMessage { msgtype } => {
                write!(f, "unknown message type {:?}", msgtype as char)
            },
            ProtocolError::UnknownAuth { auth } => write!(f, "unknown authentication method {auth}"),
            ProtocolError::InvalidLength { msgtype, len } => {
                write!(f, "invalid length {len} for message {:?}", msgtype as char)
            },
            ProtocolError::Malformed { reason } => write!(f, "malformed message: {reason}"),
            ProtocolError::Utf8(ref e) => write!(f, "malformed message: {e}"),
        }
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Error or notice reported by the server.
///
/// This is the body of both `ErrorResponse` and `NoticeResponse`. The message body consists of
/// one or more identified fields, followed by a zero byte as a terminator.
///
/// Fields can appear in any order. Since more field types might be added in future,
/// unrecognized fields are kept but have no accessor.
///
/// <https://www.postgresql.org/docs/current/protocol-error-fields.html>
#[derive(Clone, PartialEq, Eq)]
pub struct ServerError {
    fields: Vec<(u8, ByteStr)>,
}

macro_rules! field {
    ($($(#[$doc:meta])* $name:ident, $code:literal;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(&self) -> Option<&str> {
                self.field($code)
            }
        )*
    };
}

impl ServerError {
    /// Create error from fields.
    pub fn new(fields: Vec<(u8, ByteStr)>) -> Self {
        Self { fields }
    }

    /// Returns field by its code.
    pub fn field(&self, code: u8) -> Option<&str> {
        self.fields.iter().find(|(c, _)| *c == code).map(|(_, v)| v.as_str())
    }

    /// Returns all the fields.
    pub fn fields(&self) -> &[(u8, ByteStr)] {
        &self.fields
    }

    field! {
        /// Severity, localized.
        ///
        /// `ERROR`, `FATAL`, or `PANIC` (in an error message), or `WARNING`, `NOTICE`,
        /// `DEBUG`, `INFO`, or `LOG` (in a notice message).
        severity_localized, b'S';
        /// Severity, never localized.
        severity_raw, b'V';
        /// The SQLSTATE code for the error.
        code, b'C';
        /// Detail: an optional secondary error message carrying more detail about the problem.
        detail, b'D';
        /// Hint: an optional suggestion what to do about the problem.
        hint, b'H';
        /// Position: the field value is a decimal ASCII integer, indicating an error cursor
        /// position as an index into the original query string.
        position, b'P';
        /// Internal position, for internally generated commands.
        internal_position, b'p';
        /// The text of a failed internally-generated command.
        internal_query, b'q';
        /// Call stack traceback of the active procedural language functions.
        where_, b'W';
        /// Schema name, if the error was associated with a specific database object.
        schema, b's';
        /// Table name, if the error was associated with a specific table.
        table, b't';
        /// Column name, if the error was associated with a specific table column.
        column, b'c';
        /// Data type name, if the error was associated with a specific data type.
        data_type, b'd';
        /// Constraint name, if the error was associated with a specific constraint.
        constraint, b'n';
        /// The file name of the source-code location where the error was reported.
        file, b'F';
        /// The line number of the source-code location where the error was reported.
        line, b'L';
        /// The name of the source-code routine reporting the error.
        routine, b'R';
    }

    /// Severity, prefering the non localized one.
    pub fn severity(&self) -> &str {
        self.severity_raw().or(self.severity_localized()).unwrap_or("ERROR")
    }

    /// The primary human-readable error message.
    pub fn message(&self) -> &str {
        self.field(b'M').unwrap_or_default()
    }

    pub(crate) fn decode(mut body: Bytes) -> Result<Self, ProtocolError> {
        let mut fields = vec![];
        loop {
            match body.try_u8()? {
                0 => break,
                code => fields.push((code, body.get_nul_bytestr()?)),
            }
        }
        if body.has_remaining() {
            return Err(ProtocolError::trailing());
        }
        Ok(Self { fields })
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) {
        for (code, value) in &self.fields {
            buf.put_u8(*code);
            buf.put_nul_string(value);
        }
        buf.put_u8(0);
    }
}

impl std::error::Error for ServerError { }

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity(), self.message())?;
        if let Some(code) = self.code() {
            write!(f, " ({code})")?;
        }
        if let Some(detail) = self.detail() {
            write!(f, ", detail: {detail}")?;
        }
        if let Some(hint) = self.hint() {
            write!(f, ", hint: {hint}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
