//! Message framing.
//!
//! Functions here split exactly one frame from a read buffer. When the buffer does not yet
//! contain a complete frame, [`None`] is returned and the buffer is left untouched, so the
//! caller can read more bytes and retry.
use bytes::{Buf, BytesMut};

use super::{
    BackendMessage, FrontendMessage, ProtocolError,
    backend::SslResponse,
};

/// Message type byte plus length.
const HEADER_LEN: usize = 5;

/// Frame length limit, postgres itself rejects messages larger than 1GiB.
pub const MAX_FRAME_LEN: usize = 0x4000_0000;

/// Split one tagged frame, returns message type and body.
fn split_frame(buf: &mut BytesMut) -> Result<Option<(u8, bytes::Bytes)>, ProtocolError> {
    let Some(mut header) = buf.get(..HEADER_LEN) else {
        return Ok(None);
    };

    let msgtype = header.get_u8();
    let len = header.get_i32();

    if len < 4 || len as usize > MAX_FRAME_LEN {
        return Err(ProtocolError::invalid_length(msgtype, len));
    }

    let len = len as usize;
    if buf.len() < 1/*msgtype*/ + len {
        buf.reserve(1 + len - buf.len());
        return Ok(None);
    }

    buf.advance(HEADER_LEN);
    let body = buf.split_to(len - 4).freeze();
    Ok(Some((msgtype, body)))
}

/// Decode one backend message from `buf`.
pub fn decode_backend(buf: &mut BytesMut) -> Result<Option<BackendMessage>, ProtocolError> {
    match split_frame(buf)? {
        Some((msgtype, body)) => BackendMessage::decode(msgtype, body).map(Some),
        None => Ok(None),
    }
}

/// Decode one tagged frontend message from `buf`.
pub fn decode_frontend(buf: &mut BytesMut) -> Result<Option<FrontendMessage>, ProtocolError> {
    match split_frame(buf)? {
        Some((msgtype, body)) => FrontendMessage::decode(msgtype, body).map(Some),
        None => Ok(None),
    }
}

/// Decode one untagged startup family message from `buf`.
///
/// This is the first message a server receives: `StartupMessage`, `SSLRequest` or `CancelRequest`.
pub fn decode_startup(buf: &mut BytesMut) -> Result<Option<FrontendMessage>, ProtocolError> {
    let Some(mut header) = buf.get(..4) else {
        return Ok(None);
    };

    let len = header.get_i32();
    if len < 8 || len as usize > MAX_FRAME_LEN {
        return Err(ProtocolError::invalid_length(0, len));
    }

    let len = len as usize;
    if buf.len() < len {
        return Ok(None);
    }

    buf.advance(4);
    let body = buf.split_to(len - 4).freeze();
    FrontendMessage::decode_startup(body).map(Some)
}

/// Decode the single byte response of `SSLRequest`.
pub fn decode_ssl_response(buf: &mut BytesMut) -> Result<Option<SslResponse>, ProtocolError> {
    match buf.first() {
        Some(&byte) => {
            let response = SslResponse::from_byte(byte)?;
            buf.advance(1);
            Ok(Some(response))
        },
        None => Ok(None),
    }
}
