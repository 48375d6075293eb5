//! Sql source of a query.
//!
//! Whether a query is prepared as a named statement and cached in the connection is decided by
//! its sql source, see [`Sql::persistent`].
use std::{borrow::Cow, sync::Arc};

/// Sql text of a query.
pub trait Sql {
    fn sql(&self) -> &str;

    /// Returns `true` if the statement is prepared with a name and kept in the connection cache.
    ///
    /// Non persistent sql runs as the unnamed statement, which the server discards on the next
    /// `Parse`.
    fn persistent(&self) -> bool {
        true
    }
}

macro_rules! persistent {
    ($($ty:ty),*) => {$(
        impl Sql for $ty {
            fn sql(&self) -> &str {
                self
            }
        }
    )*};
}

persistent!(&str, String, Box<str>, Arc<str>, Cow<'_, str>);

/// Sql that runs as the unnamed statement, see [`SqlExt::once`].
#[derive(Debug, Clone, Copy)]
pub struct SqlOnce<S>(S);

impl<S: Sql> Sql for SqlOnce<S> {
    fn sql(&self) -> &str {
        self.0.sql()
    }

    fn persistent(&self) -> bool {
        false
    }
}

/// Extension for [`Sql`] to opt out of statement caching.
///
/// ```no_run
/// use postwire::SqlExt;
///
/// # async fn app(conn: &mut postwire::Connection, table: &str) -> postwire::Result<()> {
/// // generated sql would fill the cache with statements that never run again
/// let sql = format!("SELECT count(*) FROM {table}");
/// let (count,) = postwire::query::<_, (i64,)>(sql.once(), conn).fetch_one().await?;
/// # Ok(())
/// # }
/// ```
pub trait SqlExt: Sql + Sized {
    fn once(self) -> SqlOnce<Self> {
        SqlOnce(self)
    }
}

impl<S: Sql> SqlExt for S { }

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn persistence() {
        assert!("SELECT 1".persistent());
        assert!(String::from("SELECT 1").persistent());
        assert!(!"SELECT 1".once().persistent());
        assert!(!"SELECT 1".once().once().persistent());
        assert_eq!(Arc::<str>::from("SELECT 2").once().sql(), "SELECT 2");
    }
}
