use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::{fmt, str::FromStr};

use super::{ConversionError, Decode, Encode};
use crate::{
    postgres::{Oid, PgType, oid},
    value::{Payload, WireValue},
};

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Each binary digit holds four decimal digits.
const NBASE: u16 = 10000;

/// Postgres arbitrary precision number.
///
/// Stored as normalized decimal text: no leading integer zeros and no trailing fractional
/// zeros, so `-123.40` is kept as `-123.4`. `NaN`, `Infinity` and `-Infinity` are supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Numeric(String);

impl Numeric {
    /// Parse decimal string.
    pub fn new(decimal: &str) -> Result<Self, ConversionError> {
        Parsed::parse(decimal).map(|e| Self(e.to_string()))
    }

    /// Not a number.
    pub fn nan() -> Self {
        Self(String::from("NaN"))
    }

    /// Returns the normalized decimal string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if value is `NaN`.
    pub fn is_nan(&self) -> bool {
        self.0 == "NaN"
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Numeric {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Self(itoa::Buffer::new().format(value).to_owned())
    }
}

impl PgType for Numeric {
    const OID: Oid = oid::NUMERIC;
    const ARRAY_OID: Oid = oid::NUMERIC_ARRAY;
}

enum Parsed<'a> {
    NaN,
    Infinity { negative: bool },
    Finite {
        negative: bool,
        int: &'a str,
        frac: &'a str,
    },
}

impl<'a> Parsed<'a> {
    fn parse(decimal: &'a str) -> Result<Self, ConversionError> {
        let invalid = || ConversionError::invalid(format!("invalid numeric {decimal:?}"));

        match decimal {
            "NaN" => return Ok(Self::NaN),
            "Infinity" | "+Infinity" => return Ok(Self::Infinity { negative: false }),
            "-Infinity" => return Ok(Self::Infinity { negative: true }),
            _ => {},
        }

        let (negative, unsigned) = match decimal.as_bytes().first() {
            Some(b'-') => (true, &decimal[1..]),
            Some(b'+') => (false, &decimal[1..]),
            _ => (false, decimal),
        };

        let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

        if (int.is_empty() && frac.is_empty()) || !all_digits(int) || !all_digits(frac) {
            return Err(invalid());
        }

        let int = int.trim_start_matches('0');
        let frac = frac.trim_end_matches('0');
        let negative = negative && !(int.is_empty() && frac.is_empty());

        Ok(Self::Finite { negative, int, frac })
    }

    fn encode(&self, buf: &mut BytesMut) {
        let (negative, int, frac) = match *self {
            Parsed::NaN => return put_header(buf, 0, 0, NUMERIC_NAN, 0),
            Parsed::Infinity { negative: false } => return put_header(buf, 0, 0, NUMERIC_PINF, 0),
            Parsed::Infinity { negative: true } => return put_header(buf, 0, 0, NUMERIC_NINF, 0),
            Parsed::Finite { negative, int, frac } => (negative, int, frac),
        };

        // align both parts to four digit groups around the decimal point
        let int_pad = (4 - int.len() % 4) % 4;
        let frac_pad = (4 - frac.len() % 4) % 4;

        let mut aligned = String::with_capacity(int_pad + int.len() + frac.len() + frac_pad);
        aligned.extend(std::iter::repeat_n('0', int_pad));
        aligned.push_str(int);
        aligned.push_str(frac);
        aligned.extend(std::iter::repeat_n('0', frac_pad));

        let mut digits: Vec<u16> = aligned
            .as_bytes()
            .chunks_exact(4)
            .map(|group| group.iter().fold(0, |acc, d| acc * 10 + u16::from(d - b'0')))
            .collect();

        let mut weight = ((int_pad + int.len()) / 4) as i16 - 1;

        let leading = digits.iter().take_while(|d| **d == 0).count();
        digits.drain(..leading);
        weight -= leading as i16;

        while digits.last() == Some(&0) {
            digits.pop();
        }

        if digits.is_empty() {
            weight = 0;
        }

        let sign = if negative { NUMERIC_NEG } else { NUMERIC_POS };
        put_header(buf, digits.len() as i16, weight, sign, frac.len() as u16);
        for digit in digits {
            buf.put_u16(digit);
        }
    }
}

impl fmt::Display for Parsed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Parsed::NaN => f.write_str("NaN"),
            Parsed::Infinity { negative: false } => f.write_str("Infinity"),
            Parsed::Infinity { negative: true } => f.write_str("-Infinity"),
            Parsed::Finite { negative, int, frac } => {
                if negative {
                    f.write_str("-")?;
                }
                match int.is_empty() {
                    true => f.write_str("0")?,
                    false => f.write_str(int)?,
                }
                if !frac.is_empty() {
                    write!(f, ".{frac}")?;
                }
                Ok(())
            },
        }
    }
}

fn put_header(buf: &mut BytesMut, ndigits: i16, weight: i16, sign: u16, dscale: u16) {
    buf.put_i16(ndigits);
    buf.put_i16(weight);
    buf.put_u16(sign);
    buf.put_u16(dscale);
}

/// Decode binary numeric.
///
/// ```text
/// ndigits: i16, weight: i16, sign: u16, dscale: u16, digits: [u16; ndigits]
/// ```
///
/// value is `digits[0] * NBASE ^ weight + digits[1] * NBASE ^ (weight - 1) + ..`
fn decode_binary(mut b: Bytes) -> Result<Numeric, ConversionError> {
    if b.len() < 8 {
        return Err(ConversionError::length("Numeric", 8, b.len()));
    }

    let ndigits = b.get_i16();
    let weight = b.get_i16();
    let sign = b.get_u16();
    let dscale = b.get_u16();

    if ndigits < 0 || b.len() != ndigits as usize * 2 {
        return Err(ConversionError::length("Numeric", 8 + ndigits.max(0) as usize * 2, 8 + b.len()));
    }

    let negative = match sign {
        NUMERIC_POS => false,
        NUMERIC_NEG => true,
        NUMERIC_NAN => return Ok(Numeric::nan()),
        NUMERIC_PINF => return Ok(Numeric(String::from("Infinity"))),
        NUMERIC_NINF => return Ok(Numeric(String::from("-Infinity"))),
        _ => return Err(ConversionError::invalid("invalid numeric sign")),
    };

    let digits = (0..ndigits)
        .map(|_| match b.get_u16() {
            d if d < NBASE => Ok(d),
            _ => Err(ConversionError::invalid("invalid numeric digit")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let digit = |i: i32| usize::try_from(i).ok().and_then(|i| digits.get(i)).copied().unwrap_or(0);

    let mut int = String::new();
    for i in 0..=i32::from(weight) {
        let d = digit(i);
        match i {
            0 => int.push_str(itoa::Buffer::new().format(d)),
            _ => int.push_str(&format!("{d:04}")),
        }
    }

    let mut frac = String::new();
    // groups before the first stored digit are zero
    for i in i32::from(weight) + 1..i32::from(ndigits).max(i32::from(weight) + 1) {
        frac.push_str(&format!("{:04}", digit(i)));
    }
    frac.truncate(dscale as usize);

    let int = int.trim_start_matches('0');
    let frac = frac.trim_end_matches('0');
    let negative = negative && !(int.is_empty() && frac.is_empty());
    let parsed = Parsed::Finite { negative, int, frac };

    Ok(Numeric(parsed.to_string()))
}

impl Encode for Numeric {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        let mut buf = BytesMut::with_capacity(16);
        Parsed::parse(&self.0)?.encode(&mut buf);
        Ok(WireValue::binary(Self::OID, buf.freeze()))
    }
}

impl Decode for Numeric {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.payload(&[oid::NUMERIC], "Numeric")?.1 {
            Payload::Binary(b) => decode_binary(b),
            Payload::Text(t) => Numeric::new(&t),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn binary(bytes: &'static [u8]) -> WireValue {
        WireValue::binary(oid::NUMERIC, Bytes::from_static(bytes))
    }

    #[test]
    fn trailing_zero_trimmed() {
        // -123.40: ndigits 2, weight 0, negative, dscale 2, digits [123, 4000]
        let value = binary(&[0, 2, 0, 0, 0x40, 0, 0, 2, 0, 123, 0x0f, 0xa0]);
        assert_eq!(Numeric::decode(value).unwrap().as_str(), "-123.4");
    }

    #[test]
    fn decode_binary_forms() {
        // 0.0001
        let value = binary(&[0, 1, 0xff, 0xff, 0, 0, 0, 4, 0, 1]);
        assert_eq!(Numeric::decode(value).unwrap().as_str(), "0.0001");
        // 10000
        let value = binary(&[0, 1, 0, 1, 0, 0, 0, 0, 0, 1]);
        assert_eq!(Numeric::decode(value).unwrap().as_str(), "10000");
        // zero
        let value = binary(&[0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(Numeric::decode(value).unwrap().as_str(), "0");
        // NaN
        let value = binary(&[0, 0, 0, 0, 0xc0, 0, 0, 0]);
        assert!(Numeric::decode(value).unwrap().is_nan());
        // truncated digits
        assert!(Numeric::decode(binary(&[0, 2, 0, 0, 0, 0, 0, 0, 0, 1])).is_err());
    }

    #[test]
    fn encode_layout() {
        let value = Numeric::new("-123.40").unwrap().encode().unwrap();
        assert_eq!(
            value.as_slice(),
            Some(&[0, 2, 0, 0, 0x40, 0, 0, 1, 0, 123, 0x0f, 0xa0][..]),
        );

        let value = Numeric::new("12345678.9").unwrap().encode().unwrap();
        // digits [1234, 5678, 9000], weight 1
        assert_eq!(
            value.as_slice(),
            Some(&[0, 3, 0, 1, 0, 0, 0, 1, 0x04, 0xd2, 0x16, 0x2e, 0x23, 0x28][..]),
        );
    }

    #[test]
    fn text() {
        assert_eq!(Numeric::new("007.50").unwrap().as_str(), "7.5");
        assert_eq!(Numeric::new("-0.000").unwrap().as_str(), "0");
        assert_eq!(Numeric::new(".5").unwrap().as_str(), "0.5");
        assert!(Numeric::new("1e10").is_err());
        assert!(Numeric::new("-").is_err());
        assert!(Numeric::new("1.2.3").is_err());

        let decoded = Numeric::decode(WireValue::text(oid::NUMERIC, "42.000")).unwrap();
        assert_eq!(decoded, Numeric::from(42));
    }
}
