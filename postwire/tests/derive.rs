use std::sync::Arc;

use bytes::Bytes;
use postwire::{
    Decode, Encode, FromRow, PgType, Row, WireValue,
    common::ByteStr,
    postgres::{
        Oid, PgFormat,
        backend::{DataRow, FieldDescription, RowDescription},
        oid,
    },
    row::Columns,
};

#[derive(Debug, PartialEq, FromRow)]
struct User {
    id: i32,
    #[postwire(rename = "user_name")]
    name: String,
    email: Option<String>,
}

#[derive(Debug, PartialEq, FromRow)]
struct Pair(i64, String);

#[derive(Debug, PartialEq, Encode, Decode, PgType)]
struct UserId(i32);

#[derive(Debug, PartialEq, Encode, Decode, PgType)]
struct Meta {
    tags: Vec<String>,
    #[postwire(rename = "rank")]
    score: f64,
    note: Option<String>,
}

fn row(columns: &[(&'static str, Oid)], values: Vec<Option<&'static str>>) -> Row {
    let fields = columns
        .iter()
        .map(|&(name, type_oid)| FieldDescription {
            name: ByteStr::from_static(name),
            table_oid: 0,
            column_attr: 0,
            type_oid,
            type_size: -1,
            type_modifier: -1,
            format: PgFormat::Text,
        })
        .collect();
    let columns = Arc::new(Columns::new(RowDescription { fields }, &[]));
    let data = DataRow {
        columns: values.into_iter().map(|e| e.map(|e| Bytes::from_static(e.as_bytes()))).collect(),
    };
    Row::assemble(columns, data).unwrap()
}

#[test]
fn from_row_named() {
    let user: User = row(
        &[("email", oid::TEXT), ("user_name", oid::VARCHAR), ("id", oid::INT4)],
        vec![None, Some("alice"), Some("7")],
    )
    .decode()
    .unwrap();

    assert_eq!(user, User { id: 7, name: "alice".into(), email: None });
}

#[test]
fn from_row_missing_column() {
    let err = row(&[("id", oid::INT4)], vec![Some("7")]).decode::<User>().unwrap_err();
    assert!(err.to_string().contains("user_name"), "{err}");
}

#[test]
fn from_row_tuple_struct() {
    let pair: Pair = row(&[("a", oid::INT8), ("b", oid::TEXT)], vec![Some("-3"), Some("x")])
        .decode()
        .unwrap();
    assert_eq!(pair, Pair(-3, "x".into()));

    let err = row(&[("a", oid::INT8)], vec![Some("-3")]).decode::<Pair>().unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn transparent_codec() {
    assert_eq!(UserId::OID, oid::INT4);
    assert_eq!(UserId::ARRAY_OID, oid::INT4_ARRAY);

    let value = UserId(5).encode().unwrap();
    assert_eq!(value.oid(), oid::INT4);
    assert_eq!(value.format(), PgFormat::Binary);

    assert_eq!(UserId::decode(WireValue::text(oid::INT4, "12")).unwrap(), UserId(12));
    assert!(UserId::decode(WireValue::text(oid::TEXT, "12")).is_err());
}

#[test]
fn transparent_array() {
    let value = vec![UserId(1), UserId(2)].encode().unwrap();
    assert_eq!(value.oid(), oid::INT4_ARRAY);

    let ids = Vec::<Option<UserId>>::decode(WireValue::text(oid::INT4_ARRAY, "{1,NULL}")).unwrap();
    assert_eq!(ids, [Some(UserId(1)), None]);
}

#[test]
fn record_codec() {
    assert_eq!(Meta::OID, oid::JSONB);
    assert_eq!(Meta::ARRAY_OID, oid::JSONB_ARRAY);

    let meta = Meta { tags: vec!["a".into()], score: 1.5, note: None };
    let value = meta.encode().unwrap();
    assert_eq!(value.oid(), oid::JSONB);

    let text = WireValue::text(oid::JSONB, r#"{"tags":["a","b"],"rank":2.0}"#);
    let meta = Meta::decode(text).unwrap();
    assert_eq!(meta, Meta { tags: vec!["a".into(), "b".into()], score: 2.0, note: None });

    assert!(Meta::decode(WireValue::text(oid::JSONB, "[1]")).is_err());
    assert!(Meta::decode(WireValue::text(oid::JSON, r#"{"tags":1,"rank":0}"#)).is_err());
}

#[test]
fn record_in_row() {
    let (id, meta): (UserId, Meta) = row(
        &[("id", oid::INT4), ("meta", oid::JSONB)],
        vec![Some("9"), Some(r#"{"tags":[],"rank":0.5,"note":"n"}"#)],
    )
    .decode()
    .unwrap();

    assert_eq!(id, UserId(9));
    assert_eq!(meta.note.as_deref(), Some("n"));
}
