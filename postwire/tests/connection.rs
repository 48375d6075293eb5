use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex},
    time::Duration,
};

use postwire::{
    Encode, ErrorKind, StartupConfig,
    common::ByteStr,
    postgres::{
        FrontendMessage, PgFormat,
        backend::{
            Authentication, BindComplete, CloseComplete, NoData, NoticeResponse,
            NotificationResponse, ParameterDescription, ParseComplete,
        },
        frontend::{Close, Target},
        oid,
    },
};

mod server;

use server::{auth, complete, data_row, error, field, pair, ready, row_description, server_error};

#[tokio::test]
async fn md5_select_one() {
    let (mut conn, mut server) = pair();

    let client = async {
        let config = StartupConfig::new("vapor_username").password("vapor_password");
        conn.authenticate(config).await.unwrap();
        assert_eq!(conn.parameter("server_version"), Some("17.0"));
        assert_eq!(conn.backend_key_data().map(|e| e.process_id), Some(42));

        let rows = conn.query("SELECT 1::int4 AS one", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].try_get::<_, i32>("one").unwrap(), 1);
    };

    let server = async {
        let FrontendMessage::Startup(startup) = server.recv_startup().await else {
            panic!("expected startup")
        };
        assert_eq!(startup.protocol_version, 196608);
        assert_eq!(startup.param("user"), Some("vapor_username"));

        server.send([auth(Authentication::MD5Password { salt: [1, 2, 3, 4] })]).await;
        let FrontendMessage::Password(password) = server.recv().await else {
            panic!("expected password")
        };
        assert_eq!(password.password, "md55245fe7ab8054036ba739cd532730127");
        server.send([auth(Authentication::Ok)]).await;
        server.startup_complete().await;

        let batch = server.recv_until_sync().await;
        let [FrontendMessage::Parse(parse), FrontendMessage::Describe(describe), FrontendMessage::Sync] = &batch[..] else {
            panic!("expected parse, describe, sync, found {batch:?}")
        };
        assert_eq!(parse.name, "");
        assert_eq!(parse.sql, "SELECT 1::int4 AS one");
        assert_eq!(describe.target, Target::Statement);
        server.send([
            ParseComplete.into(),
            ParameterDescription { oids: vec![] }.into(),
            row_description(vec![field("one", oid::INT4, PgFormat::Text)]),
            ready(),
        ])
        .await;

        let batch = server.recv_until_sync().await;
        let [FrontendMessage::Bind(bind), FrontendMessage::Execute(execute), FrontendMessage::Sync] = &batch[..] else {
            panic!("expected bind, execute, sync, found {batch:?}")
        };
        assert!(bind.params.is_empty());
        assert_eq!(bind.result_formats, [PgFormat::Binary]);
        assert_eq!(execute.max_rows, 0);
        server.send([
            BindComplete.into(),
            data_row(vec![Some(b"\0\0\0\x01".as_slice())]),
            complete("SELECT 1"),
            ready(),
        ])
        .await;
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn cleartext_password() {
    let (mut conn, mut server) = pair();

    let client = async {
        conn.authenticate(StartupConfig::new("alice").password("secret")).await.unwrap();
    };

    let server = async {
        server.recv_startup().await;
        server.send([auth(Authentication::CleartextPassword)]).await;
        assert_eq!(
            server.recv().await,
            FrontendMessage::Password(postwire::postgres::frontend::PasswordMessage {
                password: "secret".into()
            }),
        );
        server.send([auth(Authentication::Ok)]).await;
        server.startup_complete().await;
    };

    tokio::join!(client, server);
    assert!(!conn.is_closed());
}

#[tokio::test]
async fn trust_with_password() {
    let (mut conn, mut server) = pair();

    let client = async {
        let err = conn.authenticate(StartupConfig::new("alice").password("secret")).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config(_)), "{err}");
    };

    let server = async {
        server.recv_startup().await;
        server.send([auth(Authentication::Ok)]).await;
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn md5_without_password() {
    let (mut conn, mut server) = pair();

    let client = async {
        let err = conn.authenticate(StartupConfig::new("alice")).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Auth(_)), "{err}");
    };

    let server = async {
        server.recv_startup().await;
        server.send([auth(Authentication::MD5Password { salt: [0; 4] })]).await;
    };

    tokio::join!(client, server);
    assert!(conn.is_closed());
}

#[tokio::test]
async fn unsupported_auth() {
    let (mut conn, mut server) = pair();

    let client = async {
        let err = conn.authenticate(StartupConfig::new("alice").password("x")).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Auth(_)), "{err}");
    };

    let server = async {
        server.recv_startup().await;
        server.send([auth(Authentication::SASL { mechanisms: vec!["SCRAM-SHA-256".into()] })]).await;
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn startup_error() {
    let (mut conn, mut server) = pair();

    let client = async {
        let err = conn.authenticate(StartupConfig::new("nobody")).await.unwrap_err();
        let db = err.as_server_error().unwrap();
        assert_eq!(db.code(), Some("28000"));
    };

    let server = async {
        server.recv_startup().await;
        server.send([error("28000", "role \"nobody\" does not exist")]).await;
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn error_drain() {
    let (mut conn, mut server) = pair();

    let client = async {
        conn.authenticate(StartupConfig::new("alice")).await.unwrap();

        let err = conn.simple_query("SELECT foo").await.unwrap_err();
        assert_eq!(err.as_server_error().and_then(|e| e.code()), Some("42703"));
        assert!(!err.is_fatal());

        // connection stays usable
        let rows = conn.simple_query("SELECT 1").await.unwrap();
        assert_eq!(rows[0].try_get::<_, i32>("?column?").unwrap(), 1);
    };

    let server = async {
        server.trust().await;

        assert_eq!(server.recv_query().await, "SELECT foo");
        server.send([
            row_description(vec![field("foo", oid::INT4, PgFormat::Text)]),
            data_row(vec![Some(b"1".as_slice())]),
            error("42703", "column \"foo\" does not exist"),
            ready(),
        ])
        .await;

        assert_eq!(server.recv_query().await, "SELECT 1");
        server.send([
            row_description(vec![field("?column?", oid::INT4, PgFormat::Text)]),
            data_row(vec![Some(b"1".as_slice())]),
            complete("SELECT 1"),
            ready(),
        ])
        .await;
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn extended_error_drain() {
    let (mut conn, mut server) = pair();

    let client = async {
        conn.authenticate(StartupConfig::new("alice")).await.unwrap();

        let err = conn.query("SELEC 1", &[]).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Database(_)), "{err}");
        assert_eq!(err.as_server_error().and_then(|e| e.code()), Some("42601"));
        assert!(!conn.is_closed());

        let rows = conn.query("SELECT 1::int4 AS one", &[]).await.unwrap();
        assert_eq!(rows[0].try_get::<_, i32>("one").unwrap(), 1);
    };

    let server = async {
        server.trust().await;

        let batch = server.recv_until_sync().await;
        let [FrontendMessage::Parse(parse), FrontendMessage::Describe(_), FrontendMessage::Sync] = &batch[..] else {
            panic!("expected parse, describe, sync, found {batch:?}")
        };
        assert_eq!(parse.sql, "SELEC 1");
        server.send([error("42601", "syntax error at or near \"SELEC\""), ready()]).await;

        let batch = server.recv_until_sync().await;
        let FrontendMessage::Parse(parse) = &batch[0] else { panic!("expected parse") };
        assert_eq!(parse.sql, "SELECT 1::int4 AS one");
        server.send([
            ParseComplete.into(),
            ParameterDescription::default().into(),
            row_description(vec![field("one", oid::INT4, PgFormat::Text)]),
            ready(),
        ])
        .await;

        server.recv_until_sync().await;
        server.send([
            BindComplete.into(),
            data_row(vec![Some(b"\0\0\0\x01".as_slice())]),
            complete("SELECT 1"),
            ready(),
        ])
        .await;
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn unexpected_message_closes() {
    let (mut conn, mut server) = pair();

    let client = async {
        conn.authenticate(StartupConfig::new("alice")).await.unwrap();

        let err = conn.simple_query("SELECT 1").await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Protocol(_)), "{err}");
        assert!(err.is_fatal());
        assert!(conn.is_closed());

        let err = conn.simple_query("SELECT 2").await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Closed(_)), "{err}");
    };

    let server = async {
        server.trust().await;
        assert_eq!(server.recv_query().await, "SELECT 1");
        server.send([ParseComplete.into(), ready()]).await;
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn too_many_params() {
    let (mut conn, mut server) = pair();

    let client = async {
        conn.authenticate(StartupConfig::new("alice")).await.unwrap();

        let values = vec![1i32; 40_000];
        let params = values.iter().map(|v| v as &(dyn Encode + Sync)).collect::<Vec<_>>();
        let err = conn.query("SELECT 1", &params).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Conversion(_)), "{err}");
        assert!(!conn.is_closed());

        let mut query = postwire::query::<_, (i32,)>("SELECT 1", &mut conn);
        for value in &values {
            query = query.bind(*value);
        }
        let err = query.fetch_all().await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Conversion(_)), "{err}");

        let rows = conn.simple_query("SELECT 2").await.unwrap();
        assert_eq!(rows.len(), 0);
    };

    let server = async {
        server.trust().await;
        // nothing is sent for the rejected queries
        assert_eq!(server.recv_query().await, "SELECT 2");
        server.send([complete("SELECT 0"), ready()]).await;
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn conversion_error_drain() {
    let (mut conn, mut server) = pair();

    let client = async {
        conn.authenticate(StartupConfig::new("alice")).await.unwrap();

        let err = postwire::query::<_, (String,)>("SELECT 1", &mut conn)
            .fetch_all()
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Conversion(_)), "{err}");

        let rows = conn.simple_query("SELECT 2").await.unwrap();
        assert_eq!(rows.len(), 0);
    };

    let server = async {
        server.trust().await;

        // prepared and cached
        let batch = server.recv_until_sync().await;
        let FrontendMessage::Parse(parse) = &batch[0] else { panic!("expected parse") };
        assert_eq!(parse.name, "s0000000001");
        server.send([
            ParseComplete.into(),
            ParameterDescription::default().into(),
            row_description(vec![field("?column?", oid::INT4, PgFormat::Text)]),
            ready(),
        ])
        .await;

        server.recv_until_sync().await;
        server.send([
            BindComplete.into(),
            data_row(vec![Some(b"\0\0\0\x01".as_slice())]),
            data_row(vec![Some(b"\0\0\0\x02".as_slice())]),
            complete("SELECT 2"),
            ready(),
        ])
        .await;

        assert_eq!(server.recv_query().await, "SELECT 2");
        server.send([complete("SELECT 0"), ready()]).await;
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn abandoned_batch() {
    let (mut conn, mut server) = pair();

    let client = async {
        conn.authenticate(StartupConfig::new("alice")).await.unwrap();

        let slow = tokio::time::timeout(Duration::from_millis(10), conn.simple_query("SELECT pg_sleep(1)"));
        assert!(slow.await.is_err());

        let rows = conn.simple_query("SELECT 'two'").await.unwrap();
        assert_eq!(rows[0].try_get::<_, String>(0).unwrap(), "two");
    };

    let server = async {
        server.trust().await;

        assert_eq!(server.recv_query().await, "SELECT pg_sleep(1)");
        tokio::time::sleep(Duration::from_millis(100)).await;
        server.send([
            row_description(vec![field("pg_sleep", oid::TEXT, PgFormat::Text)]),
            data_row(vec![Some(b"".as_slice())]),
            complete("SELECT 1"),
            ready(),
        ])
        .await;

        assert_eq!(server.recv_query().await, "SELECT 'two'");
        server.send([
            row_description(vec![field("?column?", oid::TEXT, PgFormat::Text)]),
            data_row(vec![Some(b"two".as_slice())]),
            complete("SELECT 1"),
            ready(),
        ])
        .await;
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn listen_notify() {
    let (mut conn, mut server) = pair();
    let received = Arc::new(Mutex::new(vec![]));
    let notices = Arc::new(Mutex::new(vec![]));

    let client = async {
        conn.authenticate(StartupConfig::new("alice")).await.unwrap();

        let notices = notices.clone();
        conn.on_notice(move |notice| notices.lock().unwrap().push(notice.message().to_owned()));

        let sink = received.clone();
        conn.listen("events", move |n| sink.lock().unwrap().push(n.payload.to_string()))
            .await
            .unwrap();

        conn.notify("events", "it's here").await.unwrap();
        assert_eq!(*received.lock().unwrap(), ["it's here"]);

        // server goes away while waiting
        let err = conn.drive_notifications().await.unwrap_err();
        assert!(err.is_fatal(), "{err}");
        assert!(conn.is_closed());

        let err = conn.simple_query("SELECT 1").await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Closed(_)), "{err}");
    };

    let server = async {
        server.trust().await;

        assert_eq!(server.recv_query().await, "LISTEN \"events\"");
        server.send([complete("LISTEN"), ready()]).await;

        assert_eq!(server.recv_query().await, "NOTIFY \"events\", 'it''s here'");
        server.send([
            NoticeResponse(server_error("00000", "queued")).into(),
            complete("NOTIFY"),
            NotificationResponse {
                process_id: 42,
                channel: ByteStr::from_static("events"),
                payload: ByteStr::from_static("it's here"),
            }
            .into(),
            ready(),
        ])
        .await;

        server.send([
            NotificationResponse {
                process_id: 43,
                channel: ByteStr::from_static("events"),
                payload: ByteStr::from_static("again"),
            }
            .into(),
            NotificationResponse {
                process_id: 43,
                channel: ByteStr::from_static("other"),
                payload: ByteStr::from_static("ignored"),
            }
            .into(),
        ])
        .await;
        server.shutdown().await;
    };

    tokio::join!(client, server);
    assert_eq!(*received.lock().unwrap(), ["it's here", "again"]);
    assert_eq!(*notices.lock().unwrap(), ["queued"]);
}

#[tokio::test]
async fn close_unlistens() {
    let (mut conn, mut server) = pair();

    let client = async {
        conn.authenticate(StartupConfig::new("alice")).await.unwrap();
        conn.listen("events", |_| { }).await.unwrap();
        conn.close().await.unwrap();
        assert!(conn.is_closed());
    };

    let server = async {
        server.trust().await;
        assert_eq!(server.recv_query().await, "LISTEN \"events\"");
        server.send([complete("LISTEN"), ready()]).await;
        assert_eq!(server.recv_query().await, "UNLISTEN \"events\"");
        server.send([complete("UNLISTEN"), ready()]).await;
        assert_eq!(server.recv().await, FrontendMessage::Terminate);
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn close_after_failed_unlisten() {
    let (mut conn, mut server) = pair();

    let client = async {
        conn.authenticate(StartupConfig::new("alice")).await.unwrap();
        conn.listen("events", |_| { }).await.unwrap();

        let err = conn.close().await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Database(_)), "{err}");
        assert!(conn.is_closed());
        assert!(conn.close().await.is_ok());
    };

    let server = async {
        server.trust().await;
        assert_eq!(server.recv_query().await, "LISTEN \"events\"");
        server.send([complete("LISTEN"), ready()]).await;
        assert_eq!(server.recv_query().await, "UNLISTEN \"events\"");
        server.send([error("25P02", "current transaction is aborted"), ready()]).await;
        assert_eq!(server.recv().await, FrontendMessage::Terminate);
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn statement_cache_eviction() {
    let (mut conn, mut server) = pair();

    let client = async {
        conn.authenticate(StartupConfig::new("alice")).await.unwrap();
        conn.set_statement_cache_capacity(NonZeroUsize::new(1).unwrap());

        let first = conn.prepare("SELECT 1", &[]).await.unwrap();
        assert_eq!(first.name().as_str(), "s0000000001");
        let cached = conn.prepare("SELECT 1", &[]).await.unwrap();
        assert_eq!(cached.name(), first.name());

        let second = conn.prepare("DELETE FROM t", &[]).await.unwrap();
        assert_eq!(second.name().as_str(), "s0000000002");
        assert!(second.columns().is_empty());

        let rows = conn.query_prepared(&second, &[]).await.unwrap();
        assert!(rows.is_empty());
    };

    let server = async {
        server.trust().await;

        for (name, sql) in [("s0000000001", "SELECT 1"), ("s0000000002", "DELETE FROM t")] {
            let batch = server.recv_until_sync().await;
            let FrontendMessage::Parse(parse) = &batch[0] else { panic!("expected parse") };
            assert_eq!((parse.name.as_str(), parse.sql.as_str()), (name, sql));
            server.send([ParseComplete.into(), ParameterDescription::default().into(), NoData.into(), ready()]).await;
        }

        let batch = server.recv_until_sync().await;
        assert_eq!(
            batch[0],
            FrontendMessage::Close(Close { target: Target::Statement, name: "s0000000001".into() }),
        );
        let FrontendMessage::Bind(bind) = &batch[1] else { panic!("expected bind") };
        assert_eq!(bind.statement, "s0000000002");
        server.send([CloseComplete.into(), BindComplete.into(), complete("DELETE 0"), ready()]).await;
    };

    tokio::join!(client, server);
}

#[tokio::test]
async fn fluent_query() {
    let (mut conn, mut server) = pair();

    let client = async {
        conn.authenticate(StartupConfig::new("alice")).await.unwrap();

        let res = postwire::execute("INSERT INTO t(name) VALUES($1)", &mut conn)
            .bind("Deez")
            .await
            .unwrap();
        assert_eq!(res.rows_affected, 1);

        let one = postwire::query::<_, (i64, Option<String>)>("SELECT $1::int8, NULL::text", &mut conn)
            .bind(7i64)
            .fetch_optional()
            .await
            .unwrap();
        assert_eq!(one, Some((7, None)));
    };

    let server = async {
        server.trust().await;

        let batch = server.recv_until_sync().await;
        let FrontendMessage::Parse(parse) = &batch[0] else { panic!("expected parse") };
        assert_eq!(parse.param_oids, [oid::TEXT]);
        server.send([ParseComplete.into(), ParameterDescription { oids: vec![oid::TEXT] }.into(), NoData.into(), ready()]).await;

        let batch = server.recv_until_sync().await;
        let FrontendMessage::Bind(bind) = &batch[0] else { panic!("expected bind") };
        assert_eq!(bind.param_formats, [PgFormat::Text]);
        assert_eq!(bind.params, [Some(bytes::Bytes::from_static(b"Deez"))]);
        server.send([BindComplete.into(), complete("INSERT 0 1"), ready()]).await;

        let batch = server.recv_until_sync().await;
        let FrontendMessage::Parse(parse) = &batch[0] else { panic!("expected parse") };
        assert_eq!(parse.param_oids, [oid::INT8]);
        server.send([
            ParseComplete.into(),
            ParameterDescription { oids: vec![oid::INT8] }.into(),
            row_description(vec![field("int8", oid::INT8, PgFormat::Text), field("text", oid::TEXT, PgFormat::Text)]),
            ready(),
        ])
        .await;

        let batch = server.recv_until_sync().await;
        let FrontendMessage::Bind(bind) = &batch[0] else { panic!("expected bind") };
        assert_eq!(bind.param_formats, [PgFormat::Binary]);
        server.send([
            BindComplete.into(),
            data_row(vec![Some(b"\0\0\0\0\0\0\0\x07".as_slice()), None]),
            complete("SELECT 1"),
            ready(),
        ])
        .await;
    };

    tokio::join!(client, server);
}
