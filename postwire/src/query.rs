//! Query API types.
use std::{marker::PhantomData, pin::Pin};

use crate::{
    Connection, FromRow, Result, Row,
    connection::param_oids,
    row::{RowNotFound, RowResult},
    sql::Sql,
    statement::StatementName,
    types::{ConversionError, Encode},
    value::WireValue,
};

/// Entrypoint of the query API.
///
/// ```no_run
/// # async fn app(conn: &mut postwire::Connection) -> postwire::Result<()> {
/// let (id, name) = postwire::query::<_, (i32, String)>("SELECT $1::int4, $2::text", conn)
///     .bind(420)
///     .bind("Foo")
///     .fetch_one()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub fn query<'a, SQL, R>(sql: SQL, conn: &'a mut Connection) -> Query<'a, SQL, R> {
    Query { sql, conn, params: Vec::new(), error: None, _p: PhantomData }
}

/// Same as [`query`] with [`Row`] as the output.
pub fn query_row<'a, SQL>(sql: SQL, conn: &'a mut Connection) -> Query<'a, SQL, Row> {
    query(sql, conn)
}

/// Same as [`query`], intended for [`execute`][Query::execute] or `.await`.
pub fn execute<'a, SQL>(sql: SQL, conn: &'a mut Connection) -> Query<'a, SQL, Row> {
    query(sql, conn)
}

/// The query API.
///
/// Persistent [`Sql`] is prepared as named statement and cached in the connection, see
/// [`SqlExt::once`][crate::SqlExt::once] to opt out.
#[must_use = "query do nothing unless fetched or executed"]
pub struct Query<'a, SQL, R> {
    sql: SQL,
    conn: &'a mut Connection,
    params: Vec<WireValue>,
    /// first bind error, reported when the query runs
    error: Option<ConversionError>,
    _p: PhantomData<R>,
}

impl<SQL, R> Query<'_, SQL, R> {
    /// Bind query parameter.
    pub fn bind<V: Encode>(mut self, value: V) -> Self {
        match value.encode() {
            Ok(value) => self.params.push(value),
            Err(err) => {
                self.error.get_or_insert(err);
            },
        }
        self
    }
}

impl<SQL: Sql, R> Query<'_, SQL, R> {
    async fn run<F>(self, on_row: F) -> Result<RowResult>
    where
        F: FnMut(Row) -> Result<()>,
    {
        let Query { sql, conn, params, error, .. } = self;

        if let Some(err) = error {
            return Err(err.into());
        }

        let oids = param_oids(&params);
        let stmt = match sql.persistent() {
            true => conn.prepare(sql.sql(), &oids).await?,
            false => conn.describe(StatementName::unnamed(), sql.sql(), &oids).await?,
        };

        conn.execute_statement(&stmt, &params, on_row).await
    }

    /// Execute statement and return number of rows affected.
    pub async fn execute(self) -> Result<RowResult> {
        self.run(|_| Ok(())).await
    }
}

impl<SQL: Sql, R: FromRow> Query<'_, SQL, R> {
    /// Fetch all rows into [`Vec`].
    pub async fn fetch_all(self) -> Result<Vec<R>> {
        let mut rows = vec![];
        self.run(|row| {
            rows.push(R::from_row(row)?);
            Ok(())
        })
        .await?;
        Ok(rows)
    }

    /// Fetch one row, returns [`RowNotFound`] if there is none.
    pub async fn fetch_one(self) -> Result<R> {
        match self.fetch_optional().await? {
            Some(row) => Ok(row),
            None => Err(RowNotFound.into()),
        }
    }

    /// Optionally fetch one row, the remaining rows are discarded.
    pub async fn fetch_optional(self) -> Result<Option<R>> {
        let mut first = None;
        self.run(|row| {
            if first.is_none() {
                first = Some(R::from_row(row)?);
            }
            Ok(())
        })
        .await?;
        Ok(first)
    }
}

impl<'a, SQL, R> IntoFuture for Query<'a, SQL, R>
where
    SQL: Sql + Send + 'a,
    R: Send + 'a,
{
    type Output = Result<RowResult>;

    type IntoFuture = Pin<Box<dyn Future<Output = Result<RowResult>> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

impl<SQL: std::fmt::Debug, R> std::fmt::Debug for Query<'_, SQL, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
