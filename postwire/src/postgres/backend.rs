//! Postgres Backend Messages
//!
//! <https://www.postgresql.org/docs/current/protocol-message-formats.html>
use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Oid, PgFormat, ProtocolError, ServerError, frontend::write_frame};
use crate::{
    common::ByteStr,
    ext::{BufMutExt, BytesExt, UsizeExt},
};

/// A type that can be decoded from and encoded into postgres backend message.
pub trait BackendProtocol: Sized {
    /// Message type.
    const MSGTYPE: u8;

    /// Read the main body of the message.
    fn decode_body(body: Bytes) -> Result<Self, ProtocolError>;

    /// Write the main body of the message.
    fn encode_body(&self, buf: &mut BytesMut);

    /// Decode message, returns error if `msgtype` does not match.
    fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
        if Self::MSGTYPE != msgtype {
            return Err(ProtocolError::unexpected(Self::MSGTYPE, msgtype));
        }
        Self::decode_body(body)
    }

    /// Write the full frame of the message.
    fn write(&self, buf: &mut BytesMut) {
        write_frame(Some(Self::MSGTYPE), buf, |buf| self.encode_body(buf));
    }
}

/// Postgres backend messages
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    Authentication(Authentication),
    BackendKeyData(BackendKeyData),
    BindComplete(BindComplete),
    CloseComplete(CloseComplete),
    CommandComplete(CommandComplete),
    DataRow(DataRow),
    ErrorResponse(ErrorResponse),
    EmptyQueryResponse(EmptyQueryResponse),
    NegotiateProtocolVersion(NegotiateProtocolVersion),
    NoData(NoData),
    NoticeResponse(NoticeResponse),
    NotificationResponse(NotificationResponse),
    ParameterDescription(ParameterDescription),
    ParameterStatus(ParameterStatus),
    ParseComplete(ParseComplete),
    PortalSuspended(PortalSuspended),
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
}

macro_rules! match_backend {
    ($($name:ident,)*) => {
        impl BackendMessage {
            pub fn msgtype(&self) -> u8 {
                match self {
                    $(Self::$name(_) => $name::MSGTYPE,)*
                }
            }

            /// Get message name from message type.
            ///
            /// Returns `"Unknown"` for unknown message type.
            pub fn message_name(msgtype: u8) -> &'static str {
                match msgtype {
                    $($name::MSGTYPE => stringify!($name),)*
                    _ => "Unknown",
                }
            }

            /// Decode message body by its message type.
            pub fn decode(msgtype: u8, body: Bytes) -> Result<Self, ProtocolError> {
                let message = match msgtype {
                    $($name::MSGTYPE => Self::$name($name::decode_body(body)?),)*
                    _ => return Err(ProtocolError::unknown(msgtype)),
                };
                Ok(message)
            }

            /// Write the full frame of the message.
            pub fn write(&self, buf: &mut BytesMut) {
                match self {
                    $(Self::$name(m) => m.write(buf),)*
                }
            }
        }

        $(
            impl From<$name> for BackendMessage {
                fn from(value: $name) -> Self {
                    Self::$name(value)
                }
            }
        )*
    };
}

match_backend! {
    Authentication,
    BackendKeyData,
    BindComplete,
    CloseComplete,
    CommandComplete,
    DataRow,
    ErrorResponse,
    EmptyQueryResponse,
    NegotiateProtocolVersion,
    NoData,
    NoticeResponse,
    NotificationResponse,
    ParameterDescription,
    ParameterStatus,
    ParseComplete,
    PortalSuspended,
    ReadyForQuery,
    RowDescription,
}

impl BackendMessage {
    /// Create [`ProtocolError`] for message that is not expected in `phase`.
    pub fn unexpected(&self, phase: &'static str) -> ProtocolError {
        ProtocolError::unexpected_phase(self.msgtype(), phase)
    }
}

fn finish<T>(body: Bytes, message: T) -> Result<T, ProtocolError> {
    match body.has_remaining() {
        true => Err(ProtocolError::trailing()),
        false => Ok(message),
    }
}

/// Identifies the message as an authentication request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// Specifies that the authentication was successful.
    Ok,
    /// Specifies that Kerberos V5 authentication is required.
    KerberosV5,
    /// Specifies that a clear-text password is required.
    CleartextPassword,
    /// Specifies that an MD5-encrypted password is required.
    MD5Password {
        /// The salt to use when encrypting the password.
        salt: [u8; 4],
    },
    /// Specifies that GSSAPI authentication is required.
    GSS,
    /// GSSAPI or SSPI authentication data.
    GSSContinue { data: Bytes },
    /// Specifies that SSPI authentication is required.
    SSPI,
    /// Specifies that SASL authentication is required.
    SASL {
        /// List of SASL authentication mechanisms, in the server's order of preference.
        mechanisms: Vec<String>,
    },
    /// Specifies that this message contains a SASL challenge.
    SASLContinue {
        /// SASL data, specific to the SASL mechanism being used.
        data: Bytes,
    },
    /// Specifies that SASL authentication has completed.
    SASLFinal {
        /// SASL outcome "additional data", specific to the SASL mechanism being used.
        data: Bytes,
    },
}

impl Authentication {
    /// Authentication method name, used in error message.
    pub fn method_name(&self) -> &'static str {
        match self {
            Authentication::Ok => "Ok",
            Authentication::KerberosV5 => "KerberosV5",
            Authentication::CleartextPassword => "CleartextPassword",
            Authentication::MD5Password { .. } => "MD5Password",
            Authentication::GSS => "GSS",
            Authentication::GSSContinue { .. } => "GSSContinue",
            Authentication::SSPI => "SSPI",
            Authentication::SASL { .. } => "SASL",
            Authentication::SASLContinue { .. } => "SASLContinue",
            Authentication::SASLFinal { .. } => "SASLFinal",
        }
    }
}

impl BackendProtocol for Authentication {
    const MSGTYPE: u8 = b'R';

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let auth = match body.try_i32()? {
            0 => Authentication::Ok,
            2 => Authentication::KerberosV5,
            3 => Authentication::CleartextPassword,
            5 => Authentication::MD5Password { salt: body.try_u32()?.to_be_bytes() },
            7 => Authentication::GSS,
            8 => Authentication::GSSContinue { data: body.split_off(0) },
            9 => Authentication::SSPI,
            10 => {
                let mut mechanisms = vec![];
                loop {
                    let name = body.get_nul_string()?;
                    if name.is_empty() {
                        break;
                    }
                    mechanisms.push(name);
                }
                Authentication::SASL { mechanisms }
            },
            11 => Authentication::SASLContinue { data: body.split_off(0) },
            12 => Authentication::SASLFinal { data: body.split_off(0) },
            auth => return Err(ProtocolError::unknown_auth(auth)),
        };
        finish(body, auth)
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        match self {
            Authentication::Ok => buf.put_i32(0),
            Authentication::KerberosV5 => buf.put_i32(2),
            Authentication::CleartextPassword => buf.put_i32(3),
            Authentication::MD5Password { salt } => {
                buf.put_i32(5);
                buf.put_slice(salt);
            },
            Authentication::GSS => buf.put_i32(7),
            Authentication::GSSContinue { data } => {
                buf.put_i32(8);
                buf.put_slice(data);
            },
            Authentication::SSPI => buf.put_i32(9),
            Authentication::SASL { mechanisms } => {
                buf.put_i32(10);
                for name in mechanisms {
                    buf.put_nul_string(name);
                }
                buf.put_u8(b'\0');
            },
            Authentication::SASLContinue { data } => {
                buf.put_i32(11);
                buf.put_slice(data);
            },
            Authentication::SASLFinal { data } => {
                buf.put_i32(12);
                buf.put_slice(data);
            },
        }
    }
}

/// Identifies the message as cancellation key data.
///
/// The frontend must save these values if it wishes to be able to issue CancelRequest messages later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendKeyData {
    /// The process ID of this backend.
    pub process_id: i32,
    /// The secret key of this backend.
    pub secret_key: i32,
}

impl BackendProtocol for BackendKeyData {
    const MSGTYPE: u8 = b'K';

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let process_id = body.try_i32()?;
        let secret_key = body.try_i32()?;
        finish(body, Self { process_id, secret_key })
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_i32(self.process_id);
        buf.put_i32(self.secret_key);
    }
}

/// Identifies the message as a run-time parameter status report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterStatus {
    /// The name of the run-time parameter being reported
    pub name: String,
    /// The current value of the parameter
    pub value: String,
}

impl BackendProtocol for ParameterStatus {
    const MSGTYPE: u8 = b'S';

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let name = body.get_nul_string()?;
        let value = body.get_nul_string()?;
        finish(body, Self { name, value })
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_nul_string(&self.name);
        buf.put_nul_string(&self.value);
    }
}

/// Identifies the message as an error.
///
/// The message body consists of one or more identified fields, followed by a zero byte as a terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse(pub ServerError);

/// A warning message. The frontend should display the message.
///
/// Carries the same fields as [`ErrorResponse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeResponse(pub ServerError);

macro_rules! field_msg {
    ($($name:ident, $ty:literal;)*) => {$(
        impl BackendProtocol for $name {
            const MSGTYPE: u8 = $ty;

            fn decode_body(body: Bytes) -> Result<Self, ProtocolError> {
                ServerError::decode(body).map(Self)
            }

            fn encode_body(&self, buf: &mut BytesMut) {
                self.0.encode(buf);
            }
        }
    )*};
}

field_msg! {
    ErrorResponse, b'E';
    NoticeResponse, b'N';
}

/// Identifies the message as a notification response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResponse {
    /// The process ID of the notifying backend process.
    pub process_id: i32,
    /// The name of the channel that the notify has been raised on.
    pub channel: ByteStr,
    /// The “payload” string passed from the notifying process.
    pub payload: ByteStr,
}

impl BackendProtocol for NotificationResponse {
    const MSGTYPE: u8 = b'A';

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let process_id = body.try_i32()?;
        let channel = body.get_nul_bytestr()?;
        let payload = body.get_nul_bytestr()?;
        finish(body, Self { process_id, channel, payload })
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_i32(self.process_id);
        buf.put_nul_string(&self.channel);
        buf.put_nul_string(&self.payload);
    }
}

/// A single field of [`RowDescription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    /// The field name.
    pub name: ByteStr,
    /// If the field can be identified as a column of a specific table,
    /// the object ID of the table; otherwise zero.
    pub table_oid: Oid,
    /// If the field can be identified as a column of a specific table,
    /// the attribute number of the column; otherwise zero.
    pub column_attr: i16,
    /// The object ID of the field's data type.
    pub type_oid: Oid,
    /// The data type size (see pg_type.typlen).
    ///
    /// Note that negative values denote variable-width types.
    pub type_size: i16,
    /// The type modifier (see pg_attribute.atttypmod).
    pub type_modifier: i32,
    /// The format code being used for the field.
    ///
    /// In a RowDescription returned from the statement variant of Describe,
    /// the format code is not yet known and will always be zero.
    pub format: PgFormat,
}

/// Identifies the message as a row description
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowDescription {
    /// Description of each field in a row (can be empty).
    pub fields: Vec<FieldDescription>,
}

impl BackendProtocol for RowDescription {
    const MSGTYPE: u8 = b'T';

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let len = body.try_i16()?;
        let mut fields = Vec::with_capacity(len.max(0) as usize);
        for _ in 0..len {
            fields.push(FieldDescription {
                name: body.get_nul_bytestr()?,
                table_oid: body.try_u32()?,
                column_attr: body.try_i16()?,
                type_oid: body.try_u32()?,
                type_size: body.try_i16()?,
                type_modifier: body.try_i32()?,
                format: PgFormat::from_code(body.try_i16()?)?,
            });
        }
        finish(body, Self { fields })
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_i16(self.fields.len().to_i16());
        for field in &self.fields {
            buf.put_nul_string(&field.name);
            buf.put_u32(field.table_oid);
            buf.put_i16(field.column_attr);
            buf.put_u32(field.type_oid);
            buf.put_i16(field.type_size);
            buf.put_i32(field.type_modifier);
            buf.put_i16(field.format.format_code());
        }
    }
}

/// Identifies the message as a data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRow {
    /// Column values, [`None`] is a NULL column value.
    pub columns: Vec<Option<Bytes>>,
}

impl BackendProtocol for DataRow {
    const MSGTYPE: u8 = b'D';

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let len = body.try_i16()?;
        let mut columns = Vec::with_capacity(len.max(0) as usize);
        for _ in 0..len {
            let column = match body.try_i32()? {
                -1 => None,
                len if len < 0 => return Err(ProtocolError::malformed("negative column length")),
                len => Some(body.try_split(len as usize)?),
            };
            columns.push(column);
        }
        finish(body, Self { columns })
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_i16(self.columns.len().to_i16());
        for column in &self.columns {
            match column {
                Some(value) => {
                    buf.put_i32(value.len().to_i32());
                    buf.put_slice(value);
                },
                None => buf.put_i32(-1),
            }
        }
    }
}

/// Identifies the message as a command-completed response
///
/// For an INSERT command, the tag is INSERT oid rows, where rows is the number of rows inserted.
/// oid used to be the object ID of the inserted row if rows was 1 and the target table had OIDs,
/// but OIDs system columns are not supported anymore; therefore oid is always 0.
///
/// For a DELETE command, the tag is DELETE rows where rows is the number of rows deleted.
///
/// For an UPDATE command, the tag is UPDATE rows where rows is the number of rows updated.
///
/// For a MERGE command, the tag is MERGE rows where rows is the number of rows inserted, updated, or deleted.
///
/// For a SELECT or CREATE TABLE AS command, the tag is SELECT rows where rows is the number of rows retrieved.
///
/// For a MOVE command, the tag is MOVE rows where rows is the number of rows
/// the cursor's position has been changed by.
///
/// For a FETCH command, the tag is FETCH rows where rows is the number of rows that have
/// been retrieved from the cursor.
///
/// For a COPY command, the tag is COPY rows where rows is the number of rows copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandComplete {
    /// The command tag. This is usually a single word that identifies which SQL command was completed.
    pub tag: ByteStr,
}

impl CommandComplete {
    /// Returns the number of rows affected, zero for commands without a row count.
    pub fn rows_affected(&self) -> u64 {
        let mut words = self.tag.split_whitespace();
        let rows = match words.next() {
            Some("INSERT") => words.nth(1),
            Some("DELETE" | "UPDATE" | "MERGE" | "SELECT" | "MOVE" | "FETCH" | "COPY") => words.next(),
            _ => None,
        };
        rows.and_then(|e| e.parse().ok()).unwrap_or(0)
    }
}

impl BackendProtocol for CommandComplete {
    const MSGTYPE: u8 = b'C';

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let tag = body.get_nul_bytestr()?;
        finish(body, Self { tag })
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_nul_string(&self.tag);
    }
}

/// Identifies the message as a protocol version negotiation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiateProtocolVersion {
    /// Newest minor protocol version supported by the server for the major protocol version requested by the client.
    pub minor: i32,
    /// Protocol options not recognized by the server.
    pub options: Vec<String>,
}

impl BackendProtocol for NegotiateProtocolVersion {
    const MSGTYPE: u8 = b'v';

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let minor = body.try_i32()?;
        let len = body.try_i32()?;
        let options = (0..len).map(|_| body.get_nul_string()).collect::<Result<_, _>>()?;
        finish(body, Self { minor, options })
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_i32(self.minor);
        buf.put_i32(self.options.len().to_i32());
        for opt in &self.options {
            buf.put_nul_string(opt);
        }
    }
}

/// Identifies the message as a parameter description.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterDescription {
    /// The object ID of each parameter data type.
    pub oids: Vec<Oid>,
}

impl BackendProtocol for ParameterDescription {
    const MSGTYPE: u8 = b't';

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let len = body.try_i16()?;
        let oids = (0..len).map(|_| body.try_u32()).collect::<Result<_, _>>()?;
        finish(body, Self { oids })
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_i16(self.oids.len().to_i16());
        for oid in &self.oids {
            buf.put_u32(*oid);
        }
    }
}

/// Current backend transaction status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    /// Idle, not in a transaction block, `'I'`.
    #[default]
    Idle,
    /// In a transaction block, `'T'`.
    Transaction,
    /// In a failed transaction block, `'E'`.
    Failed,
}

/// Identifies the message type. ReadyForQuery is sent whenever the backend is ready for a new query cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyForQuery {
    pub status: TransactionStatus,
}

impl BackendProtocol for ReadyForQuery {
    const MSGTYPE: u8 = b'Z';

    fn decode_body(mut body: Bytes) -> Result<Self, ProtocolError> {
        let status = match body.try_u8()? {
            b'I' => TransactionStatus::Idle,
            b'T' => TransactionStatus::Transaction,
            b'E' => TransactionStatus::Failed,
            _ => return Err(ProtocolError::malformed("unknown transaction status")),
        };
        finish(body, Self { status })
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        buf.put_u8(match self.status {
            TransactionStatus::Idle => b'I',
            TransactionStatus::Transaction => b'T',
            TransactionStatus::Failed => b'E',
        });
    }
}

macro_rules! unit_msg {
    ($(
        $(#[$doc:meta])* struct $name:ident, $ty:literal;
    )*) => {$(
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl BackendProtocol for $name {
            const MSGTYPE: u8 = $ty;

            fn decode_body(body: Bytes) -> Result<Self, ProtocolError> {
                finish(body, Self)
            }

            fn encode_body(&self, _: &mut BytesMut) { }
        }
    )*};
}

unit_msg! {
    /// Identifies the message as a Bind-complete indicator.
    struct BindComplete, b'2';

    /// Identifies the message as a Close-complete indicator.
    struct CloseComplete, b'3';

    /// Identifies the message as a response to an empty query string.
    ///
    /// This substitutes for CommandComplete.
    struct EmptyQueryResponse, b'I';

    /// Identifies the message as a no-data indicator.
    struct NoData, b'n';

    /// Identifies the message as a Parse-complete indicator.
    struct ParseComplete, b'1';

    /// Identifies the message as a portal-suspended indicator.
    ///
    /// Note this only appears if an Execute message's row-count limit was reached.
    struct PortalSuspended, b's';
}

/// Single byte response of `SSLRequest`.
///
/// This is the only backend message without length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslResponse {
    /// Server is willing to perform SSL, `'S'`.
    Supported,
    /// Server is not willing to perform SSL, `'N'`.
    Unsupported,
}

impl SslResponse {
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            b'S' => Ok(Self::Supported),
            b'N' => Ok(Self::Unsupported),
            // server may send ErrorResponse if it predates SSL support
            found => Err(ProtocolError::unexpected_phase(found, "SSLRequest")),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::Supported => b'S',
            Self::Unsupported => b'N',
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn body_of<B: BackendProtocol>(msg: &B) -> Bytes {
        let mut buf = BytesMut::new();
        msg.write(&mut buf);
        assert_eq!(buf[0], B::MSGTYPE);
        buf.split_off(5).freeze()
    }

    #[test]
    fn md5_auth_layout() {
        let mut buf = BytesMut::new();
        Authentication::MD5Password { salt: [1, 2, 3, 4] }.write(&mut buf);
        assert_eq!(&buf[..], &[b'R', 0, 0, 0, 12, 0, 0, 0, 5, 1, 2, 3, 4]);
    }

    #[test]
    fn row_description() {
        let desc = RowDescription {
            fields: vec![FieldDescription {
                name: ByteStr::from_static("one"),
                table_oid: 0,
                column_attr: 0,
                type_oid: 23,
                type_size: 4,
                type_modifier: -1,
                format: PgFormat::Binary,
            }],
        };
        let body = body_of(&desc);
        assert_eq!(RowDescription::decode(b'T', body).unwrap(), desc);
    }

    #[test]
    fn data_row_null() {
        let body = Bytes::from_static(&[0, 2, 0, 0, 0, 1, b'x', 0xff, 0xff, 0xff, 0xff]);
        let row = DataRow::decode_body(body).unwrap();
        assert_eq!(row.columns, vec![Some(Bytes::from_static(b"x")), None]);

        let truncated = Bytes::from_static(&[0, 1, 0, 0, 0, 4, b'x']);
        assert!(DataRow::decode_body(truncated).is_err());
    }

    #[test]
    fn wrong_msgtype() {
        assert!(ReadyForQuery::decode(b'C', Bytes::from_static(b"I")).is_err());
        assert!(ReadyForQuery::decode(b'Z', Bytes::from_static(b"I\0")).is_err());
    }

    #[test]
    fn rows_affected() {
        let tag = |tag| CommandComplete { tag: ByteStr::from_static(tag) }.rows_affected();
        assert_eq!(tag("INSERT 0 5"), 5);
        assert_eq!(tag("UPDATE 3"), 3);
        assert_eq!(tag("SELECT 1"), 1);
        assert_eq!(tag("CREATE TABLE"), 0);
    }

    #[test]
    fn unknown_message() {
        assert!(BackendMessage::decode(b'?', Bytes::new()).is_err());
        assert_eq!(BackendMessage::message_name(b'Z'), "ReadyForQuery");
    }
}
