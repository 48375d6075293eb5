//! Postgres Frontend Messages
//!
//! <https://www.postgresql.org/docs/current/protocol-message-formats.html>
use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Oid, PgFormat, ProtocolError};
use crate::{
    ext::{BufMutExt, BytesExt, UsizeExt},
    value::WireValue,
};

/// The protocol version number.
///
/// The most significant 16 bits are the major version number (3 for the protocol described here).
/// The least significant 16 bits are the minor version number (0 for the protocol described here).
pub const PROTOCOL_VERSION: i32 = 196_608;

/// The `SSLRequest` code, in place of protocol version.
pub const SSL_REQUEST_CODE: i32 = 80_877_103;

/// The `CancelRequest` code, in place of protocol version.
pub const CANCEL_REQUEST_CODE: i32 = 80_877_102;

/// Write a length prefixed frame to `buf`.
///
/// The length is back-patched after the body is written, it includes itself but not the
/// message type.
pub(crate) fn write_frame(msgtype: Option<u8>, buf: &mut BytesMut, body: impl FnOnce(&mut BytesMut)) {
    if let Some(msgtype) = msgtype {
        buf.put_u8(msgtype);
    }

    let offset = buf.len();
    // reserve 4 bytes for length
    buf.put_i32(0);

    body(buf);

    let len = (buf.len() - offset).to_i32();
    (&mut buf[offset..offset + 4]).put_i32(len);
}

/// A type which can be encoded into postgres frontend message.
pub trait FrontendProtocol: Sized {
    /// Message type.
    const MSGTYPE: u8;

    /// Write the main body of the message.
    fn encode_body(&self, buf: &mut BytesMut);

    /// Read the main body of the message.
    fn decode_body(body: Bytes) -> Result<Self, ProtocolError>;

    /// Write the full frame of the message.
    fn write(&self, buf: &mut BytesMut) {
        write_frame(Some(Self::MSGTYPE), buf, |buf| self.encode_body(buf));
    }
}

/// Postgres frontend messages.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontendMessage {
    Startup(Startup),
    SslRequest,
    CancelRequest(CancelRequest),
    Password(PasswordMessage),
    Query(Query),
    Parse(Parse),
    Bind(Bind),
    Describe(Describe),
    Execute(Execute),
    Sync,
    Flush,
    Close(Close),
    Terminate,
}

macro_rules! match_frontend {
    (
        tagged { $($name:ident,)* }
        unit { $($unit:ident,)* }
    ) => {
        impl FrontendMessage {
            /// Message type, startup family messages have no message type.
            pub fn msgtype(&self) -> Option<u8> {
                match self {
                    $(Self::$name(_) => Some($name::MSGTYPE),)*
                    $(Self::$unit => Some($unit::MSGTYPE),)*
                    Self::Startup(_) | Self::SslRequest | Self::CancelRequest(_) => None,
                }
            }

            /// Write the full frame of the message.
            pub fn write(&self, buf: &mut BytesMut) {
                match self {
                    $(Self::$name(m) => m.write(buf),)*
                    $(Self::$unit => $unit.write(buf),)*
                    Self::Startup(m) => m.write(buf),
                    Self::SslRequest => write_frame(None, buf, |buf| buf.put_i32(SSL_REQUEST_CODE)),
                    Self::CancelRequest(m) => m.write(buf),
                }
            }

            /// Decode tagged message.
            pub fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
                let message = match msgtype {
                    $($name::MSGTYPE => Self::$name($name::decode_body(body)?),)*
                    $($unit::MSGTYPE => {
                        $unit::decode_body(body)?;
                        Self::$unit
                    },)*
                    _ => return Err(ProtocolError::unknown(msgtype)),
                };
                Ok(message)
            }
        }
    };
}

match_frontend! {
    tagged {
        Password,
        Query,
        Parse,
        Bind,
        Describe,
        Execute,
        Close,
    }
    unit {
        Sync,
        Flush,
        Terminate,
    }
}

// `Password` variant name differ from the message struct
use PasswordMessage as Password;

impl FrontendMessage {
    /// Decode untagged startup family message: `StartupMessage`, `SSLRequest`, or `CancelRequest`.
    pub fn decode_startup(mut body: Bytes) -> Result<Self, ProtocolError> {
        let code = body.try_i32()?;
        let message = match code {
            SSL_REQUEST_CODE => Self::SslRequest,
            CANCEL_REQUEST_CODE => Self::CancelRequest(CancelRequest {
                process_id: body.try_i32()?,
                secret_key: body.try_i32()?,
            }),
            version => {
                let mut params = vec![];
                loop {
                    let key = body.get_nul_string()?;
                    if key.is_empty() {
                        break;
                    }
                    params.push((key, body.get_nul_string()?));
                }
                Self::Startup(Startup { protocol_version: version, params })
            },
        };
        if body.has_remaining() {
            return Err(ProtocolError::trailing());
        }
        Ok(message)
    }
}

/// Postgres Startup frontend message
///
/// For historical reasons, the very first message sent by the client (the [`Startup`] message)
/// has no initial message-type byte, thus [`Startup`] does not implement [`FrontendProtocol`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Startup {
    /// The protocol version number, [`PROTOCOL_VERSION`].
    pub protocol_version: i32,
    /// The protocol version number is followed by one or more pairs of parameter name and value strings.
    pub params: Vec<(String, String)>,
}

impl Startup {
    /// Create startup message with the given user and optional database.
    ///
    /// The database defaults to the user name.
    pub fn new(user: &str, database: Option<&str>) -> Self {
        let mut params = vec![("user".to_owned(), user.to_owned())];
        if let Some(db) = database {
            params.push(("database".to_owned(), db.to_owned()));
        }
        Self { protocol_version: PROTOCOL_VERSION, params }
    }

    /// Returns parameter value.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn write(&self, buf: &mut BytesMut) {
        write_frame(None, buf, |buf| {
            buf.put_i32(self.protocol_version);
            for (key, value) in &self.params {
                buf.put_nul_string(key);
                buf.put_nul_string(value);
            }
            // A zero byte is required as a terminator after the last name/value pair.
            buf.put_u8(b'\0');
        });
    }
}

/// Request the cancellation of a query in progress.
///
/// Sent through a new connection, instead of the one executing the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelRequest {
    /// The process ID of the target backend.
    pub process_id: i32,
    /// The secret key for the target backend.
    pub secret_key: i32,
}

impl CancelRequest {
    pub fn write(&self, buf: &mut BytesMut) {
        write_frame(None, buf, |buf| {
            buf.put_i32(CANCEL_REQUEST_CODE);
            buf.put_i32(self.process_id);
            buf.put_i32(self.secret_key);
        });
    }
}

fn finish<T>(body: Bytes, message: T) -> Result<T, ProtocolError> {
    match body.has_remaining() {
        true => Err(ProtocolError::trailing()),
        false => Ok(message),
    }
}

/// Identifies the message as a password response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordMessage {
    /// The password (encrypted, if requested)
    pub password: String,
}

impl FrontendProtocol for PasswordMessage {
    const MSGTYPE: u8 = b'p';

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_nul_string(&self.password);
    }

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let password = body.get_nul_string()?;
        finish(body, Self { password })
    }
}

/// Identifies the message as a simple query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// the query string itself
    pub sql: String,
}

impl FrontendProtocol for Query {
    const MSGTYPE: u8 = b'Q';

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_nul_string(&self.sql);
    }

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let sql = body.get_nul_string()?;
        finish(body, Self { sql })
    }
}

/// Identifies the message as a Parse command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    /// prepared statement name (an empty string selects the unnamed prepared statement).
    pub name: String,
    /// The query string to be parsed.
    pub sql: String,
    /// Specifies the object ID of the parameter data type.
    ///
    /// Note that this is not an indication of the number of parameters that might appear in the query string,
    /// only the number that the frontend wants to prespecify types for.
    ///
    /// Placing a zero here is equivalent to leaving the type unspecified.
    pub param_oids: Vec<Oid>,
}

impl FrontendProtocol for Parse {
    const MSGTYPE: u8 = b'P';

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_nul_string(&self.name);
        buf.put_nul_string(&self.sql);
        buf.put_i16(self.param_oids.len().to_i16());
        for oid in &self.param_oids {
            buf.put_u32(*oid);
        }
    }

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let name = body.get_nul_string()?;
        let sql = body.get_nul_string()?;
        let len = body.try_i16()?;
        let param_oids = (0..len).map(|_| body.try_u32()).collect::<Result<_, _>>()?;
        finish(body, Self { name, sql, param_oids })
    }
}

/// Identifies the message as a Bind command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind {
    /// The name of the destination portal (an empty string selects the unnamed portal).
    pub portal: String,
    /// The name of the source prepared statement (an empty string selects the unnamed prepared statement).
    pub statement: String,
    /// The parameter [`PgFormat`].
    ///
    /// This can be empty to indicate that there are no parameters or that the parameters
    /// all use the default format (text); or one, in which case the specified format code
    /// is applied to all parameters; or it can equal the actual number of parameters.
    pub param_formats: Vec<PgFormat>,
    /// The value of the parameter, in the format indicated by the associated format code.
    ///
    /// [`None`] is a NULL parameter value, written as length -1.
    pub params: Vec<Option<Bytes>>,
    /// The result-columns [`PgFormat`], with the same rules as `param_formats`.
    pub result_formats: Vec<PgFormat>,
}

impl Bind {
    /// Create unnamed portal from values, each parameter carry its own format.
    pub fn new(statement: &str, params: &[WireValue], result_formats: Vec<PgFormat>) -> Self {
        Self {
            portal: String::new(),
            statement: statement.to_owned(),
            param_formats: params.iter().map(WireValue::format).collect(),
            params: params.iter().map(WireValue::to_bytes).collect(),
            result_formats,
        }
    }
}

impl FrontendProtocol for Bind {
    const MSGTYPE: u8 = b'B';

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_nul_string(&self.portal);
        buf.put_nul_string(&self.statement);

        buf.put_i16(self.param_formats.len().to_i16());
        for format in &self.param_formats {
            buf.put_i16(format.format_code());
        }

        buf.put_i16(self.params.len().to_i16());
        for param in &self.params {
            match param {
                Some(value) => {
                    buf.put_i32(value.len().to_i32());
                    buf.put_slice(value);
                },
                // -1 for NULL
                None => buf.put_i32(-1),
            }
        }

        buf.put_i16(self.result_formats.len().to_i16());
        for format in &self.result_formats {
            buf.put_i16(format.format_code());
        }
    }

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        fn formats(body: &mut Bytes) -> Result<Vec<PgFormat>, ProtocolError> {
            let len = body.try_i16()?;
            (0..len).map(|_| PgFormat::from_code(body.try_i16()?)).collect()
        }

        let portal = body.get_nul_string()?;
        let statement = body.get_nul_string()?;
        let param_formats = formats(&mut body)?;
        let len = body.try_i16()?;
        let mut params = Vec::with_capacity(len.max(0) as usize);
        for _ in 0..len {
            let value = match body.try_i32()? {
                -1 => None,
                len if len < 0 => return Err(ProtocolError::malformed("negative parameter length")),
                len => Some(body.try_split(len as usize)?),
            };
            params.push(value);
        }
        let result_formats = formats(&mut body)?;
        finish(body, Self { portal, statement, param_formats, params, result_formats })
    }
}

/// Target of [`Describe`] and [`Close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Prepared statement, `'S'`.
    Statement,
    /// Portal, `'P'`.
    Portal,
}

impl Target {
    fn code(self) -> u8 {
        match self {
            Target::Statement => b'S',
            Target::Portal => b'P',
        }
    }

    fn from_code(code: u8) -> Result<Self, ProtocolError> {
        match code {
            b'S' => Ok(Target::Statement),
            b'P' => Ok(Target::Portal),
            _ => Err(ProtocolError::malformed("unknown describe or close target")),
        }
    }
}

/// Identifies the message as a Describe command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Describe {
    /// Describe a prepared statement or a portal.
    pub target: Target,
    /// The name of the prepared statement or portal to describe
    /// (an empty string selects the unnamed prepared statement or portal).
    pub name: String,
}

impl FrontendProtocol for Describe {
    const MSGTYPE: u8 = b'D';

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_u8(self.target.code());
        buf.put_nul_string(&self.name);
    }

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let target = Target::from_code(body.try_u8()?)?;
        let name = body.get_nul_string()?;
        finish(body, Self { target, name })
    }
}

/// Identifies the message as a Execute command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execute {
    /// The name of the portal to execute (an empty string selects the unnamed portal).
    pub portal: String,
    /// Maximum number of rows to return, if portal contains a query that returns rows
    /// (ignored otherwise). Zero denotes “no limit”.
    pub max_rows: i32,
}

impl FrontendProtocol for Execute {
    const MSGTYPE: u8 = b'E';

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_nul_string(&self.portal);
        buf.put_i32(self.max_rows);
    }

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let portal = body.get_nul_string()?;
        let max_rows = body.try_i32()?;
        finish(body, Self { portal, max_rows })
    }
}

/// Identifies the message as a Close command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Close {
    /// Close a prepared statement or a portal.
    pub target: Target,
    /// The name of the prepared statement or portal to close
    /// (an empty string selects the unnamed prepared statement or portal).
    pub name: String,
}

impl FrontendProtocol for Close {
    const MSGTYPE: u8 = b'C';

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_u8(self.target.code());
        buf.put_nul_string(&self.name);
    }

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let target = Target::from_code(body.try_u8()?)?;
        let name = body.get_nul_string()?;
        finish(body, Self { target, name })
    }
}

macro_rules! unit_msg {
    ($(
        $(#[$doc:meta])* struct $name:ident, $ty:literal;
    )*) => {$(
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl FrontendProtocol for $name {
            const MSGTYPE: u8 = $ty;

            fn encode_body(&self, _: &mut BytesMut) { }

            fn decode_body(body: Bytes) -> Result<Self, ProtocolError> {
                finish(body, Self)
            }
        }
    )*};
}

unit_msg! {
    /// Identifies the message as a Sync command.
    struct Sync, b'S';

    /// Identifies the message as a Flush command.
    struct Flush, b'H';

    /// Identifies the message as a termination.
    struct Terminate, b'X';
}

macro_rules! from {
    ($($name:ident => $variant:ident,)*) => {
        $(
            impl From<$name> for FrontendMessage {
                fn from(value: $name) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

from! {
    Startup => Startup,
    CancelRequest => CancelRequest,
    PasswordMessage => Password,
    Query => Query,
    Parse => Parse,
    Bind => Bind,
    Describe => Describe,
    Execute => Execute,
    Close => Close,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn query_frame() {
        let mut buf = BytesMut::new();
        FrontendMessage::Query(Query { sql: "SELECT 1".into() }).write(&mut buf);
        assert_eq!(&buf[..], b"Q\0\0\0\x0dSELECT 1\0");
    }

    #[test]
    fn startup_frame() {
        let mut buf = BytesMut::new();
        Startup::new("postgres", None).write(&mut buf);
        // length + version + "user\0postgres\0" + terminator
        assert_eq!(buf.len(), 4 + 4 + 14 + 1);
        assert_eq!(&buf[..4], &23i32.to_be_bytes());
        assert_eq!(&buf[4..8], &PROTOCOL_VERSION.to_be_bytes());
        assert_eq!(buf[buf.len() - 1], 0);
    }

    #[test]
    fn bind_layout() {
        let bind = Bind {
            portal: String::new(),
            statement: "s1".into(),
            param_formats: vec![PgFormat::Binary],
            params: vec![Some(Bytes::from_static(&[0, 0, 0, 1])), None],
            result_formats: vec![PgFormat::Binary],
        };
        let mut buf = BytesMut::new();
        bind.write(&mut buf);

        let expected: &[u8] = &[
            b'B', 0, 0, 0, 30,
            0, b's', b'1', 0,
            0, 1, 0, 1,
            0, 2, 0, 0, 0, 4, 0, 0, 0, 1, 0xff, 0xff, 0xff, 0xff,
            0, 1, 0, 1,
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn sync_has_empty_body() {
        let mut buf = BytesMut::new();
        FrontendMessage::Sync.write(&mut buf);
        assert_eq!(&buf[..], b"S\0\0\0\x04");
    }

    #[test]
    fn startup_family_decode() {
        let mut buf = BytesMut::new();
        let startup = Startup::new("vapor_username", Some("vapor_database"));
        startup.write(&mut buf);
        let body = buf.split_off(4).freeze();
        assert_eq!(
            FrontendMessage::decode_startup(body).unwrap(),
            FrontendMessage::Startup(startup),
        );

        let mut buf = BytesMut::new();
        FrontendMessage::SslRequest.write(&mut buf);
        assert_eq!(&buf[..], &[0, 0, 0, 8, 0x04, 0xd2, 0x16, 0x2f]);
    }
}
