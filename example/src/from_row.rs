#![allow(unused)]
use postwire::{Connection, FromRow, Result, execute, query};

#[derive(Debug, FromRow)]
struct Post {
    id: i32,
    #[postwire(rename = "name")]
    title: String,
}

#[derive(FromRow)]
struct PostTuple(i32, String);

pub async fn main() -> Result<()> {
    let mut conn = Connection::connect_env().await?;

    execute("CREATE TEMP TABLE post(id serial, name text)", &mut conn).await?;

    for i in 0..4 {
        execute("INSERT INTO post(name) VALUES($1)", &mut conn)
            .bind(format!("post{i}"))
            .await?;
    }

    let posts = query::<_, Post>("SELECT * FROM post", &mut conn)
        .fetch_all()
        .await?;

    assert!(posts.iter().any(|e| e.title.as_str() == "post3"));
    assert_eq!(posts.len(), 4);

    let posts = query::<_, PostTuple>("SELECT * FROM post", &mut conn)
        .fetch_all()
        .await?;

    assert_eq!(posts[0].1, "post0");

    Ok(())
}
