//! In-process postgres server speaking through the crate codec.
#![allow(dead_code)]
use bytes::{Bytes, BytesMut};
use postwire::{
    Connection,
    common::ByteStr,
    postgres::{
        BackendMessage, FrontendMessage, Oid, PgFormat, ServerError,
        backend::{
            Authentication, BackendKeyData, CommandComplete, DataRow, ErrorResponse,
            FieldDescription, ParameterStatus, ReadyForQuery, RowDescription, TransactionStatus,
        },
        codec,
    },
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

pub struct MockServer {
    io: DuplexStream,
    buf: BytesMut,
}

/// Connected client and server, the client is not yet authenticated.
pub fn pair() -> (Connection, MockServer) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let server = MockServer { io: server, buf: BytesMut::new() };
    (Connection::from_stream(client), server)
}

impl MockServer {
    pub async fn recv_startup(&mut self) -> FrontendMessage {
        loop {
            if let Some(message) = codec::decode_startup(&mut self.buf).unwrap() {
                return message;
            }
            self.read_more().await;
        }
    }

    pub async fn recv(&mut self) -> FrontendMessage {
        loop {
            if let Some(message) = codec::decode_frontend(&mut self.buf).unwrap() {
                return message;
            }
            self.read_more().await;
        }
    }

    /// Receive messages up to and including `Sync`.
    pub async fn recv_until_sync(&mut self) -> Vec<FrontendMessage> {
        let mut messages = vec![];
        loop {
            let message = self.recv().await;
            let done = message == FrontendMessage::Sync;
            messages.push(message);
            if done {
                return messages;
            }
        }
    }

    pub async fn recv_query(&mut self) -> String {
        match self.recv().await {
            FrontendMessage::Query(query) => query.sql,
            message => panic!("expected query, found {message:?}"),
        }
    }

    async fn read_more(&mut self) {
        let n = self.io.read_buf(&mut self.buf).await.unwrap();
        assert_ne!(n, 0, "client closed the stream");
    }

    pub async fn send(&mut self, messages: impl IntoIterator<Item = BackendMessage>) {
        let mut buf = BytesMut::new();
        for message in messages {
            message.write(&mut buf);
        }
        self.io.write_all(&buf).await.unwrap();
    }

    /// Trust authentication up to the first `ReadyForQuery`.
    pub async fn trust(&mut self) {
        self.recv_startup().await;
        self.send([auth(Authentication::Ok)]).await;
        self.startup_complete().await;
    }

    pub async fn startup_complete(&mut self) {
        self.send([
            ParameterStatus { name: "server_version".into(), value: "17.0".into() }.into(),
            BackendKeyData { process_id: 42, secret_key: 7 }.into(),
            ready(),
        ])
        .await;
    }

    /// Shutdown the server side of the stream.
    pub async fn shutdown(&mut self) {
        self.io.shutdown().await.unwrap();
    }
}

pub fn auth(auth: Authentication) -> BackendMessage {
    auth.into()
}

pub fn ready() -> BackendMessage {
    ReadyForQuery { status: TransactionStatus::Idle }.into()
}

pub fn complete(tag: &'static str) -> BackendMessage {
    CommandComplete { tag: ByteStr::from_static(tag) }.into()
}

pub fn error(code: &'static str, message: &'static str) -> BackendMessage {
    ErrorResponse(server_error(code, message)).into()
}

pub fn server_error(code: &'static str, message: &'static str) -> ServerError {
    ServerError::new(vec![
        (b'S', ByteStr::from_static("ERROR")),
        (b'V', ByteStr::from_static("ERROR")),
        (b'C', ByteStr::from_static(code)),
        (b'M', ByteStr::from_static(message)),
    ])
}

pub fn field(name: &'static str, type_oid: Oid, format: PgFormat) -> FieldDescription {
    FieldDescription {
        name: ByteStr::from_static(name),
        table_oid: 0,
        column_attr: 0,
        type_oid,
        type_size: -1,
        type_modifier: -1,
        format,
    }
}

pub fn row_description(fields: Vec<FieldDescription>) -> BackendMessage {
    RowDescription { fields }.into()
}

pub fn data_row(columns: Vec<Option<&'static [u8]>>) -> BackendMessage {
    DataRow { columns: columns.into_iter().map(|e| e.map(Bytes::from_static)).collect() }.into()
}
