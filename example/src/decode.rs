use postwire::{
    Connection, Decode, Encode, PgType, Result, Value, query,
    types::{Json, Numeric, Point},
};
use serde::{Deserialize, Serialize};
use time::{PrimitiveDateTime, OffsetDateTime};

#[derive(Debug, Decode, Encode, PgType)]
struct MyId(i32);

#[derive(Decode)]
struct SomeId<T>(T);

#[derive(Debug, PartialEq, Encode, Decode, PgType)]
struct Meta {
    tags: Vec<String>,
    score: f64,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Eq)]
struct Foo {
    id: i32,
}

pub async fn main() -> Result<()> {
    let mut conn = Connection::connect_env().await?;

    let (null,): (Option<String>,) = query("SELECT NULL::TEXT", &mut conn).fetch_one().await?;

    assert!(null.is_none());

    let (my_id,): (MyId,) = query("SELECT $1::int4", &mut conn)
        .bind(MyId(420))
        .fetch_one()
        .await?;

    assert_eq!(my_id.0, 420);

    let (some_id,): (SomeId<i64>,) = query("SELECT 420::int8", &mut conn).fetch_one().await?;

    assert_eq!(some_id.0, 420);

    // `time`

    let now_utc = OffsetDateTime::now_utc();
    let (local, utc): (PrimitiveDateTime, OffsetDateTime) =
        query("SELECT now()::TIMESTAMP,now()::TIMESTAMPTZ", &mut conn)
            .fetch_one()
            .await?;

    assert_eq!(local.year(), now_utc.year());
    assert!((utc - now_utc).abs() < time::Duration::minutes(1));

    // `json`

    let (Json(json),): (Json<Foo>,) = query("SELECT '{\"id\":420}'::jsonb", &mut conn)
        .fetch_one()
        .await?;

    assert_eq!(json, Foo { id: 420 });

    let meta = Meta { tags: vec!["a".into()], score: 1.5 };
    let (back,): (Meta,) = query("SELECT $1::jsonb", &mut conn).bind(&meta).fetch_one().await?;
    assert_eq!(back, meta);

    // numeric, geometric and array

    let (numeric, point, array): (Numeric, Point, Vec<Option<i32>>) =
        query("SELECT -123.40::numeric, point(1,2), ARRAY[1,NULL,3]", &mut conn)
            .fetch_one()
            .await?;

    assert_eq!(numeric.as_str(), "-123.4");
    assert_eq!(point, Point { x: 1.0, y: 2.0 });
    assert_eq!(array, [Some(1), None, Some(3)]);

    // dynamic value

    let rows = conn.simple_query("SELECT 1::int2, 'x'::text, '{1,2}'::int4[]").await?;
    let values = rows[0].clone().into_values();
    let values = values.into_iter().map(Value::decode).collect::<Result<Vec<_>, _>>()?;
    tracing::info!("{values:?}");

    Ok(())
}
