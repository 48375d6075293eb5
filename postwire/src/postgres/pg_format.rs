use super::ProtocolError;

/// Postgres data transmission format.
///
/// For specific information, see its variant documentation.
///
/// <https://www.postgresql.org/docs/current/protocol-overview.html#PROTOCOL-FORMAT-CODES>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PgFormat {
    /// Text has format code zero.
    ///
    /// In the [`Text`][t] transmitted representation, there is no trailing null character;
    /// the frontend must add one to received values if it wants to process them as C strings.
    /// (The [`Text`][t] format does not allow embedded nulls, by the way.)
    ///
    /// [t]: PgFormat::Text
    #[default]
    Text,
    /// Binary has format code one.
    ///
    /// [`Binary`][b] representations for integers use network byte order (most significant byte first).
    /// For other data types consult the documentation or source code to learn about the binary representation.
    ///
    /// [b]: PgFormat::Binary
    Binary,
}

impl PgFormat {
    /// Return format code for current format.
    pub fn format_code(&self) -> i16 {
        match self {
            PgFormat::Text => 0,
            PgFormat::Binary => 1,
        }
    }

    /// Parse format code.
    pub fn from_code(code: i16) -> Result<Self, ProtocolError> {
        match code {
            0 => Ok(PgFormat::Text),
            1 => Ok(PgFormat::Binary),
            _ => Err(ProtocolError::malformed("unknown format code")),
        }
    }

    /// Resolve the format of `nth` column from a list of format codes.
    ///
    /// Empty list means every column use [`Text`][PgFormat::Text], a single code applies to every
    /// column, otherwise each column has its own code.
    pub fn resolve(formats: &[PgFormat], nth: usize) -> PgFormat {
        match formats {
            [] => PgFormat::Text,
            [one] => *one,
            many => many.get(nth).copied().unwrap_or_default(),
        }
    }
}
