use bytes::{BufMut, BytesMut};
use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use super::{ConversionError, Decode, Encode, fixed};
use crate::{
    postgres::{Oid, PgType, oid},
    value::{Payload, WireValue},
};

/// `PGSQL_AF_INET`
const AF_INET: u8 = 2;
/// `PGSQL_AF_INET6`
const AF_INET6: u8 = 3;

/// Postgres `inet`, host address with optional netmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Inet {
    pub addr: IpAddr,
    pub netmask: u8,
}

/// Postgres `cidr`, network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    pub addr: IpAddr,
    pub netmask: u8,
}

/// Postgres `macaddr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

/// Postgres `macaddr8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr8(pub [u8; 8]);

fn max_netmask(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl Inet {
    /// Create host address, netmask is the full address width.
    pub fn host(addr: IpAddr) -> Self {
        Self { addr, netmask: max_netmask(&addr) }
    }
}

impl From<IpAddr> for Inet {
    fn from(addr: IpAddr) -> Self {
        Self::host(addr)
    }
}

/// Binary layout:
///
/// ```text
/// family: u8, netmask: u8, is_cidr: u8, len: u8, addr: [u8; len]
/// ```
fn encode_addr(addr: &IpAddr, netmask: u8, is_cidr: bool) -> Result<BytesMut, ConversionError> {
    if netmask > max_netmask(addr) {
        return Err(ConversionError::invalid(format!("netmask {netmask} too large for {addr}")));
    }
    let mut buf = BytesMut::with_capacity(20);
    match addr {
        IpAddr::V4(v4) => {
            buf.put_slice(&[AF_INET, netmask, is_cidr as u8, 4]);
            buf.put_slice(&v4.octets());
        },
        IpAddr::V6(v6) => {
            buf.put_slice(&[AF_INET6, netmask, is_cidr as u8, 16]);
            buf.put_slice(&v6.octets());
        },
    }
    Ok(buf)
}

fn decode_addr(b: &[u8], target: &'static str) -> Result<(IpAddr, u8), ConversionError> {
    let [family, netmask, _is_cidr, len, addr @ ..] = b else {
        return Err(ConversionError::length(target, 4, b.len()));
    };
    if usize::from(*len) != addr.len() {
        return Err(ConversionError::length(target, 4 + usize::from(*len), b.len()));
    }
    let addr = match *family {
        AF_INET => IpAddr::V4(Ipv4Addr::from(fixed::<4>(addr, target)?)),
        AF_INET6 => IpAddr::V6(Ipv6Addr::from(fixed::<16>(addr, target)?)),
        _ => return Err(ConversionError::invalid(format!("unknown address family {family}"))),
    };
    // netmask is counted in bits of the address length
    if *netmask > len * 8 {
        return Err(ConversionError::invalid(format!("netmask {netmask} too large for {addr}")));
    }
    Ok((addr, *netmask))
}

/// Parse `addr[/netmask]`.
fn parse_addr(text: &str) -> Result<(IpAddr, u8), ConversionError> {
    let invalid = || ConversionError::invalid(format!("invalid network address {text:?}"));
    let (addr, netmask) = match text.split_once('/') {
        Some((addr, netmask)) => (addr, Some(netmask)),
        None => (text, None),
    };
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
    let netmask = match netmask {
        Some(netmask) => netmask.parse().map_err(|_| invalid())?,
        None => max_netmask(&addr),
    };
    if netmask > max_netmask(&addr) {
        return Err(invalid());
    }
    Ok((addr, netmask))
}

impl fmt::Display for Inet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.netmask == max_netmask(&self.addr) {
            true => write!(f, "{}", self.addr),
            false => write!(f, "{}/{}", self.addr, self.netmask),
        }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.netmask)
    }
}

impl PgType for Inet {
    const OID: Oid = oid::INET;
    const ARRAY_OID: Oid = oid::INET_ARRAY;
}

impl PgType for Cidr {
    const OID: Oid = oid::CIDR;
    const ARRAY_OID: Oid = oid::CIDR_ARRAY;
}

impl PgType for MacAddr {
    const OID: Oid = oid::MACADDR;
    const ARRAY_OID: Oid = oid::MACADDR_ARRAY;
}

impl PgType for MacAddr8 {
    const OID: Oid = oid::MACADDR8;
    const ARRAY_OID: Oid = oid::MACADDR8_ARRAY;
}

impl Encode for Inet {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        let buf = encode_addr(&self.addr, self.netmask, false)?;
        Ok(WireValue::binary(Self::OID, buf.freeze()))
    }
}

impl Encode for Cidr {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        let buf = encode_addr(&self.addr, self.netmask, true)?;
        Ok(WireValue::binary(Self::OID, buf.freeze()))
    }
}

impl Encode for IpAddr {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        Inet::host(*self).encode()
    }
}

impl PgType for IpAddr {
    const OID: Oid = oid::INET;
    const ARRAY_OID: Oid = oid::INET_ARRAY;
}

// every cidr is also a valid inet
impl Decode for Inet {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        let (addr, netmask) = match value.payload(&[oid::INET, oid::CIDR], "Inet")?.1 {
            Payload::Binary(b) => decode_addr(&b, "Inet")?,
            Payload::Text(t) => parse_addr(&t)?,
        };
        Ok(Self { addr, netmask })
    }
}

impl Decode for Cidr {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        let (addr, netmask) = match value.payload(&[oid::CIDR], "Cidr")?.1 {
            Payload::Binary(b) => decode_addr(&b, "Cidr")?,
            Payload::Text(t) => parse_addr(&t)?,
        };
        Ok(Self { addr, netmask })
    }
}

impl Decode for IpAddr {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        Inet::decode(value).map(|e| e.addr)
    }
}

macro_rules! macaddr {
    ($($name:ident, $len:literal;)*) => {$(
        impl Encode for $name {
            fn encode(&self) -> Result<WireValue, ConversionError> {
                Ok(WireValue::binary(Self::OID, bytes::Bytes::copy_from_slice(&self.0)))
            }
        }

        impl Decode for $name {
            fn decode(value: WireValue) -> Result<Self, ConversionError> {
                match value.payload(&[Self::OID], stringify!($name))?.1 {
                    Payload::Binary(b) => fixed::<$len>(&b, stringify!($name)).map(Self),
                    Payload::Text(t) => {
                        let invalid = || ConversionError::invalid(
                            format!("invalid {} {:?}", stringify!($name), t.as_str()),
                        );
                        let mut out = [0u8; $len];
                        let mut parts = t.split(|c: char| c == ':' || c == '-');
                        for byte in out.iter_mut() {
                            let part = parts.next().ok_or_else(invalid)?;
                            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
                        }
                        match parts.next() {
                            Some(_) => Err(invalid()),
                            None => Ok(Self(out)),
                        }
                    },
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for (i, byte) in self.0.iter().enumerate() {
                    if i != 0 {
                        f.write_str(":")?;
                    }
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    )*};
}

macaddr! {
    MacAddr, 6;
    MacAddr8, 8;
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn inet_binary() {
        let inet = Inet { addr: IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1)), netmask: 24 };
        let value = inet.encode().unwrap();
        assert_eq!(value.as_slice(), Some(&[2, 24, 0, 4, 192, 168, 0, 1][..]));
        assert_eq!(Inet::decode(value).unwrap(), inet);

        let cidr = Cidr { addr: IpAddr::V6(Ipv6Addr::LOCALHOST), netmask: 128 };
        let value = cidr.encode().unwrap();
        assert_eq!(value.as_slice().map(|e| e[..4].to_vec()), Some(vec![3, 128, 1, 16]));
        assert_eq!(Cidr::decode(value).unwrap(), cidr);
    }

    #[test]
    fn inet_validation() {
        let bad_len = WireValue::binary(oid::INET, Bytes::from_static(&[2, 24, 0, 16, 1, 2, 3, 4]));
        assert!(Inet::decode(bad_len).is_err());

        let bad_mask = WireValue::binary(oid::INET, Bytes::from_static(&[2, 33, 0, 4, 1, 2, 3, 4]));
        assert!(Inet::decode(bad_mask).is_err());

        let bad_family = WireValue::binary(oid::INET, Bytes::from_static(&[9, 8, 0, 4, 1, 2, 3, 4]));
        assert!(Inet::decode(bad_family).is_err());

        assert!(Inet { addr: IpAddr::V4(Ipv4Addr::LOCALHOST), netmask: 40 }.encode().is_err());
    }

    #[test]
    fn inet_text() {
        let inet = Inet::decode(WireValue::text(oid::INET, "10.0.0.1/8")).unwrap();
        assert_eq!(inet.netmask, 8);
        assert_eq!(inet.to_string(), "10.0.0.1/8");

        let host = Inet::decode(WireValue::text(oid::INET, "::1")).unwrap();
        assert_eq!(host, Inet::host(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(host.to_string(), "::1");
    }

    #[test]
    fn macaddr() {
        let mac = MacAddr([0x08, 0x00, 0x2b, 0x01, 0x02, 0x03]);
        assert_eq!(MacAddr::decode(mac.encode().unwrap()).unwrap(), mac);
        assert_eq!(MacAddr::decode(WireValue::text(oid::MACADDR, "08:00:2b:01:02:03")).unwrap(), mac);
        assert_eq!(mac.to_string(), "08:00:2b:01:02:03");

        let short = WireValue::binary(oid::MACADDR, Bytes::from_static(&[1, 2, 3, 4, 5]));
        assert!(MacAddr::decode(short).is_err());

        let mac8 = WireValue::binary(oid::MACADDR8, Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7, 8]));
        assert_eq!(MacAddr8::decode(mac8).unwrap(), MacAddr8([1, 2, 3, 4, 5, 6, 7, 8]));
    }
}
