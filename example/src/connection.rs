use std::env::var;
use postwire::{Config, Connection, Result, StartupConfig, TlsMode, query};

pub async fn main() -> Result<()> {
    let mut conn = Connection::connect(&var("DATABASE_URL").unwrap()).await?;
    query::<_, ()>("SELECT 1", &mut conn).fetch_all().await?;
    conn.close().await?;

    let mut conn = Connection::connect_env().await?;
    let rows = conn.simple_query("SELECT 1; SELECT 2").await?;
    assert_eq!(rows.len(), 2);
    tracing::info!(server_version = conn.parameter("server_version"), "connected");
    conn.close().await?;

    // closed connection stays closed
    assert!(conn.simple_query("SELECT 1").await.is_err());

    // manual startup, with extra runtime parameter
    let config = Config::from_env()?.tls(TlsMode::Disable);
    let mut conn = Connection::open(&config).await?;
    let startup = StartupConfig::from(&config).param("application_name", "postwire-example");
    conn.authenticate(startup).await?;

    let rows = conn.simple_query("SHOW application_name").await?;
    assert_eq!(rows[0].try_get::<_, String>(0)?, "postwire-example");

    conn.on_notice(|notice| tracing::info!("notice: {}", notice.message()));
    conn.simple_query("DO $$ BEGIN RAISE NOTICE 'hello'; END $$").await?;
    conn.close().await?;

    Ok(())
}
