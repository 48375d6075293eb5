use postwire::{Connection, Result, SqlExt, execute, query, query_row};

pub async fn main() -> Result<()> {
    let mut conn = Connection::connect_env().await?;

    // Execute

    execute("CREATE TEMP TABLE postwire(id serial, name text)", &mut conn).await?;

    let row = execute("INSERT INTO postwire(name) VALUES($1)", &mut conn)
        .bind("Deez")
        .await?;

    execute("INSERT INTO postwire(name) VALUES('Foo')", &mut conn).await?;

    assert_eq!(row.rows_affected, 1);

    // Queries

    let datas = query::<_, (i32, String)>("SELECT * FROM postwire", &mut conn)
        .fetch_all()
        .await?;

    assert_eq!(datas.len(), 2);

    let (_id, name) = query::<_, (i32, String)>("SELECT * FROM postwire LIMIT 1", &mut conn)
        .fetch_one()
        .await?;

    assert_eq!(name.as_str(), "Deez");
    assert_eq!(name, datas[0].1);

    let data = query::<_, (i32, String)>("SELECT * FROM postwire".once(), &mut conn)
        .fetch_optional()
        .await?;

    assert!(data.is_some());

    let data = query::<_, (i32, String)>("SELECT * FROM postwire LIMIT 0", &mut conn)
        .fetch_optional()
        .await?;

    assert!(data.is_none());

    let datas = query_row("SELECT * FROM postwire", &mut conn).fetch_all().await?;

    tracing::info!("{:?}", datas[0]);
    assert_eq!(datas[0].try_get::<_, String>("name")?.as_str(), "Deez");

    let updated = execute("UPDATE postwire SET name = upper(name)", &mut conn).await?;
    assert_eq!(updated.rows_affected, 2);

    // Prepared statement

    let stmt = conn.prepare("SELECT name FROM postwire WHERE id = $1", &[]).await?;
    let rows = conn.query_prepared(&stmt, &[&1i32]).await?;
    assert_eq!(rows[0].try_get::<_, String>("name")?, "DEEZ");

    // Error case, the connection stays usable

    execute("", &mut conn).await?;
    let err = execute("SELECT foo", &mut conn).await.unwrap_err();
    assert_eq!(err.as_server_error().and_then(|e| e.code()), Some("42703"));

    let _err = query::<_, (i32, String)>("SELECT * FROM postwire LIMIT 0", &mut conn)
        .fetch_one()
        .await
        .unwrap_err();

    let _err = query::<_, (String,)>("SELECT 1::int4", &mut conn)
        .fetch_one()
        .await
        .unwrap_err();

    let rows = conn.query("SELECT $1::int8 * 2", &[&21i64]).await?;
    assert_eq!(rows[0].try_get::<_, i64>(0)?, 42);

    Ok(())
}
