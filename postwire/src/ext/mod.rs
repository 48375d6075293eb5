use bytes::{Buf, BufMut, Bytes};

use crate::{common::ByteStr, postgres::ProtocolError};

/// Integer signess in postgres docs is awful.
pub trait UsizeExt {
    /// Length is `usize` in rust, while sometime postgres want `i32`,
    /// this will panic when overflow instead of wrapping.
    fn to_i32(self) -> i32;
    /// Length is `usize` in rust, while sometime postgres want `i16`,
    /// this will panic when overflow instead of wrapping.
    fn to_i16(self) -> i16;
}

/// Nul string operation.
pub trait StrExt {
    /// String length plus nul (1).
    fn nul_string_len(&self) -> usize;
}

/// Nul string operation in [`BufMut`]
pub trait BufMutExt {
    /// Write string and nul termination.
    fn put_nul_string(&mut self, string: &str);
}

/// Checked reads on a message body.
///
/// Every read fails with [`ProtocolError`] instead of panicking when the body is too short.
pub trait BytesExt {
    /// Try to read nul terminated string.
    ///
    /// Using [`ByteStr`] avoid allocating [`Vec`] as it required for [`String::from_utf8`]
    fn get_nul_bytestr(&mut self) -> Result<ByteStr, ProtocolError>;

    /// Try to read nul terminated string into [`String`].
    fn get_nul_string(&mut self) -> Result<String, ProtocolError> {
        self.get_nul_bytestr().map(|e| e.as_str().to_owned())
    }

    fn try_u8(&mut self) -> Result<u8, ProtocolError>;

    fn try_i16(&mut self) -> Result<i16, ProtocolError>;

    fn try_i32(&mut self) -> Result<i32, ProtocolError>;

    fn try_u32(&mut self) -> Result<u32, ProtocolError>;

    /// Split `len` bytes from the front.
    fn try_split(&mut self, len: usize) -> Result<Bytes, ProtocolError>;
}

/// Helper trait to [`Display`][std::fmt::Display] bytes.
pub trait FmtExt {
    /// Lossy [`Display`][std::fmt::Display] bytes.
    fn lossy(&self) -> LossyFmt<'_>;
}

/// Lossy [`Display`][std::fmt::Display] implementation for bytes.
pub struct LossyFmt<'a>(pub &'a [u8]);

impl UsizeExt for usize {
    fn to_i32(self) -> i32 {
        self.try_into().expect("message size too large for protocol")
    }

    fn to_i16(self) -> i16 {
        self.try_into().expect("message size too large for protocol")
    }
}

impl StrExt for str {
    fn nul_string_len(&self) -> usize {
        self.len() + 1/* nul */
    }
}

impl<B: BufMut> BufMutExt for B {
    fn put_nul_string(&mut self, string: &str) {
        self.put(string.as_bytes());
        self.put_u8(b'\0');
    }
}

macro_rules! checked {
    ($self:ident, $ty:ty, $get:ident) => {{
        if $self.remaining() < size_of::<$ty>() {
            return Err(ProtocolError::truncated());
        }
        Ok($self.$get())
    }};
}

impl BytesExt for Bytes {
    fn get_nul_bytestr(&mut self) -> Result<ByteStr, ProtocolError> {
        let Some(end) = memchr::memchr(b'\0', self) else {
            return Err(ProtocolError::unterminated());
        };
        let me = self.split_to(end);
        Buf::advance(self, 1); // nul
        ByteStr::from_utf8(me).map_err(ProtocolError::utf8)
    }

    fn try_u8(&mut self) -> Result<u8, ProtocolError> {
        checked!(self, u8, get_u8)
    }

    fn try_i16(&mut self) -> Result<i16, ProtocolError> {
        checked!(self, i16, get_i16)
    }

    fn try_i32(&mut self) -> Result<i32, ProtocolError> {
        checked!(self, i32, get_i32)
    }

    fn try_u32(&mut self) -> Result<u32, ProtocolError> {
        checked!(self, u32, get_u32)
    }

    fn try_split(&mut self, len: usize) -> Result<Bytes, ProtocolError> {
        if self.remaining() < len {
            return Err(ProtocolError::truncated());
        }
        Ok(self.split_to(len))
    }
}

impl FmtExt for [u8] {
    fn lossy(&self) -> LossyFmt<'_> {
        LossyFmt(self)
    }
}

impl std::fmt::Display for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &b in self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for LossyFmt<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "b\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nul_string() {
        let mut body = Bytes::from_static(b"user\0postgres\0");
        assert_eq!(body.get_nul_bytestr().unwrap(), "user");
        assert_eq!(body.get_nul_string().unwrap(), "postgres");
        assert!(body.is_empty());
        assert!(body.get_nul_bytestr().is_err());
    }

    #[test]
    fn checked_reads() {
        let mut body = Bytes::from_static(&[0, 0, 0, 7, 1]);
        assert_eq!(body.try_i32().unwrap(), 7);
        assert!(body.try_i16().is_err());
        assert_eq!(body.try_u8().unwrap(), 1);
        assert!(body.try_split(1).is_err());
    }
}
