//! Prepared statement.
use std::sync::Arc;

use crate::{postgres::Oid, row::Columns};

const ID_LEN: usize = 11;

/// Statement or portal name, `s` followed by zero padded counter.
#[derive(Clone, PartialEq, Eq)]
pub struct Id([u8; ID_LEN]);

impl Id {
    pub(crate) fn unnamed() -> Self {
        Self([b'?'; ID_LEN])
    }

    /// Create the next id, incrementing per connection `counter`.
    pub(crate) fn next(prefix: u8, counter: &mut u32) -> Self {
        *counter = counter.wrapping_add(1);
        let mut buf = [b'0'; ID_LEN];
        buf[0] = prefix;

        let mut b = itoa::Buffer::new();
        let id = b.format(*counter);
        let i = id.as_bytes();
        buf[ID_LEN - i.len()..].copy_from_slice(i);

        Self(buf)
    }

    pub fn as_str(&self) -> &str {
        if self.is_unnamed() {
            return "";
        }
        // only constructed from ascii
        std::str::from_utf8(&self.0[..]).unwrap_or_default()
    }

    pub fn is_unnamed(&self) -> bool {
        self.0[0] == b'?'
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.as_str()).finish()
    }
}

/// Name of a prepared statement, empty string is the unnamed statement.
#[derive(Clone, PartialEq, Eq)]
pub struct StatementName(Id);

impl StatementName {
    pub(crate) fn unnamed() -> Self {
        Self(Id::unnamed())
    }

    pub(crate) fn next(counter: &mut u32) -> Self {
        Self(Id::next(b's', counter))
    }
}

impl std::ops::Deref for StatementName {
    type Target = Id;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Debug for StatementName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("StatementName").field(&self.as_str()).finish()
    }
}

impl std::fmt::Display for StatementName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Described statement, parameter types and result columns.
///
/// Named statement stays valid on the server until it is evicted from the connection cache.
#[derive(Debug, Clone)]
pub struct Statement {
    pub(crate) name: StatementName,
    pub(crate) sql: Arc<str>,
    pub(crate) params: Arc<[Oid]>,
    pub(crate) columns: Arc<Columns>,
}

impl Statement {
    pub fn name(&self) -> &StatementName {
        &self.name
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter types inferred by the server.
    pub fn params(&self) -> &[Oid] {
        &self.params
    }

    /// Result columns, empty if the statement returns no data.
    pub fn columns(&self) -> &Columns {
        &self.columns
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn statement_name() {
        let mut counter = 0;
        assert_eq!(StatementName::next(&mut counter).as_str(), "s0000000001");
        assert_eq!(StatementName::next(&mut counter).as_str(), "s0000000002");
        assert_eq!(StatementName::unnamed().as_str(), "");

        let mut counter = u32::MAX - 1;
        assert_eq!(StatementName::next(&mut counter).as_str(), "s4294967295");
    }
}
