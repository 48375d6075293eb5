//! Postgres row operation.
//!
//! - [`Row`]
//! - [`Columns`]
//! - [`FromRow`]
//! - [`Index`]
use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    common::{ByteStr, unit_error},
    postgres::{
        Oid, PgFormat, ProtocolError,
        backend::{DataRow, FieldDescription, RowDescription},
    },
    types::{ConversionError, Decode},
    value::WireValue,
};

/// Key of a column in a row, the source table and the column name.
///
/// Column that is not a plain table column, e.g. an expression, has zero table oid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub table_oid: Oid,
    pub name: ByteStr,
}

impl ColumnKey {
    pub fn new(table_oid: Oid, name: impl Into<ByteStr>) -> Self {
        Self { table_oid, name: name.into() }
    }
}

/// Columns of a result set, shared by every row in it.
#[derive(Debug, Default)]
pub struct Columns {
    fields: Vec<FieldDescription>,
    formats: Vec<PgFormat>,
    /// column name into `(table_oid, position)`, in column order
    index: HashMap<ByteStr, Vec<(Oid, usize)>>,
}

impl Columns {
    /// Create columns from `RowDescription` and the result format codes requested in `Bind`.
    ///
    /// Simple query always use text format, which is an empty format list.
    pub fn new(desc: RowDescription, formats: &[PgFormat]) -> Self {
        let formats = (0..desc.fields.len()).map(|i| PgFormat::resolve(formats, i)).collect();
        let mut index: HashMap<ByteStr, Vec<(Oid, usize)>> = HashMap::with_capacity(desc.fields.len());
        for (i, field) in desc.fields.iter().enumerate() {
            index.entry(field.name.clone()).or_default().push((field.table_oid, i));
        }
        Self { fields: desc.fields, formats, index }
    }

    /// Returns the field descriptions.
    pub fn fields(&self) -> &[FieldDescription] {
        &self.fields
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there is no column.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Find column position by name.
    ///
    /// 1. exact `(target_table, name)` match
    /// 2. if not found and `target_table` is not zero, retry `(0, name)`
    /// 3. if `target_table` is zero, any column with that name
    pub fn position(&self, target_table: Oid, name: &str) -> Option<usize> {
        let entries = self.index.get(name)?;
        let find = |table: Oid| entries.iter().find(|(oid, _)| *oid == table).map(|(_, i)| *i);

        match find(target_table) {
            Some(i) => Some(i),
            None if target_table != 0 => find(0),
            None => entries.first().map(|(_, i)| *i),
        }
    }
}

/// Postgres row.
///
/// Values are keyed by [`ColumnKey`], see [`Columns::position`] for the lookup rule.
#[derive(Clone)]
pub struct Row {
    columns: Arc<Columns>,
    values: Vec<WireValue>,
    target_table: Oid,
}

impl Row {
    /// Zip the columns with `DataRow` values.
    ///
    /// Text format values are validated as utf8 only when decoded.
    pub fn assemble(columns: Arc<Columns>, row: DataRow) -> Result<Self, ProtocolError> {
        if columns.len() != row.columns.len() {
            return Err(ProtocolError::malformed("DataRow column count differ from RowDescription"));
        }

        let values = row
            .columns
            .into_iter()
            .zip(columns.fields.iter().zip(&columns.formats))
            .map(|(value, (field, format))| WireValue::from_column(field.type_oid, *format, value))
            .collect();

        Ok(Self { columns, values, target_table: 0 })
    }

    /// Set the table the row is decoded for, used in column lookup by name.
    pub fn with_target_table(mut self, table_oid: Oid) -> Self {
        self.target_table = table_oid;
        self
    }

    /// Returns the target table.
    pub fn target_table(&self) -> Oid {
        self.target_table
    }

    /// Returns `true` if row contains no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns the columns description.
    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    /// Returns the raw value.
    pub fn value<I: Index>(&self, idx: I) -> Result<&WireValue, ConversionError> {
        let nth = idx.position(self)?;
        self.values.get(nth).ok_or(ConversionError::IndexOutOfBounds(nth))
    }

    /// Try get and decode column.
    pub fn try_get<I: Index, R: Decode>(&self, idx: I) -> Result<R, ConversionError> {
        R::decode(self.value(idx)?.clone())
    }

    /// Try decode type using [`FromRow`] implementation.
    pub fn decode<D: FromRow>(self) -> Result<D, ConversionError> {
        D::from_row(self)
    }

    /// Consume self into the values.
    pub fn into_values(self) -> Vec<WireValue> {
        self.values
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_map();
        for (field, value) in self.columns.fields.iter().zip(&self.values) {
            dbg.entry(&field.name, value);
        }
        dbg.finish()
    }
}

/// Type that can be used for indexing column.
pub trait Index: Sized + sealed::Sealed {
    /// Returns column position in the row.
    fn position(self, row: &Row) -> Result<usize, ConversionError>;
}

impl Index for usize {
    fn position(self, row: &Row) -> Result<usize, ConversionError> {
        match self < row.len() {
            true => Ok(self),
            false => Err(ConversionError::IndexOutOfBounds(self)),
        }
    }
}

impl Index for &str {
    fn position(self, row: &Row) -> Result<usize, ConversionError> {
        row.columns
            .position(row.target_table, self)
            .ok_or_else(|| ConversionError::ColumnNotFound(String::from(self).into()))
    }
}

impl Index for &ColumnKey {
    fn position(self, row: &Row) -> Result<usize, ConversionError> {
        row.columns
            .position(self.table_oid, &self.name)
            .ok_or_else(|| ConversionError::ColumnNotFound(self.name.as_str().to_owned().into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
    impl Sealed for &super::ColumnKey { }
}

/// Query result without rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowResult {
    /// Number of rows affected, parsed from the command tag.
    pub rows_affected: u64,
}

unit_error! {
    /// An error when try to [`fetch_one`][crate::query::Query::fetch_one] and not returns any row.
    pub struct RowNotFound("row not found");
}

// ===== Traits =====

/// Type that can be constructed from a row.
///
/// Can be derived with `#[derive(FromRow)]`, struct with named fields is decoded by column name,
/// tuple struct is decoded by column position.
pub trait FromRow: Sized {
    /// Construct self from row.
    fn from_row(row: Row) -> Result<Self, ConversionError>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self, ConversionError> {
        Ok(row)
    }
}

impl FromRow for () {
    fn from_row(_: Row) -> Result<Self, ConversionError> {
        Ok(())
    }
}

macro_rules! from_row_tuple {
    ($($t:ident $i:literal),*) => {
        impl<$($t),*> FromRow for ($($t),*,)
        where
            $($t: Decode),*
        {
            fn from_row(row: Row) -> Result<Self, ConversionError> {
                Ok((
                    $(row.try_get($i)?),*,
                ))
            }
        }
    };
}

from_row_tuple!(T0 0);
from_row_tuple!(T0 0, T1 1);
from_row_tuple!(T0 0, T1 1, T2 2);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3, T4 4, T5 5, T6 6, T7 7);
