use bytes::{Buf, BufMut, BytesMut};
use std::fmt;

use super::{ConversionError, Decode, Encode};
use crate::{
    postgres::{Oid, PgType, oid},
    value::{Payload, WireValue},
};

/// Postgres `point`, a pair of `float8`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Postgres `polygon`, a closed list of points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn put(&self, buf: &mut BytesMut) {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
    }

    /// Parse `(x,y)`, returns the rest of the input.
    fn parse(text: &str) -> Result<(Point, &str), ConversionError> {
        let invalid = || ConversionError::invalid(format!("invalid point {text:?}"));
        let text = text.trim_start().strip_prefix('(').ok_or_else(invalid)?;
        let (inner, rest) = text.split_once(')').ok_or_else(invalid)?;
        let (x, y) = inner.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse().map_err(|_| invalid())?;
        let y = y.trim().parse().map_err(|_| invalid())?;
        Ok((Point { x, y }, rest))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, point) in self.points.iter().enumerate() {
            if i != 0 {
                f.write_str(",")?;
            }
            write!(f, "{point}")?;
        }
        f.write_str(")")
    }
}

impl PgType for Point {
    const OID: Oid = oid::POINT;
    const ARRAY_OID: Oid = oid::POINT_ARRAY;
}

impl PgType for Polygon {
    const OID: Oid = oid::POLYGON;
    const ARRAY_OID: Oid = oid::POLYGON_ARRAY;
}

impl Encode for Point {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        let mut buf = BytesMut::with_capacity(16);
        self.put(&mut buf);
        Ok(WireValue::binary(Self::OID, buf.freeze()))
    }
}

impl Decode for Point {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.payload(&[oid::POINT], "Point")?.1 {
            Payload::Binary(mut b) => {
                if b.len() != 16 {
                    return Err(ConversionError::length("Point", 16, b.len()));
                }
                Ok(Point { x: b.get_f64(), y: b.get_f64() })
            },
            Payload::Text(t) => match Point::parse(&t)? {
                (point, "") => Ok(point),
                _ => Err(ConversionError::invalid(format!("invalid point {:?}", t.as_str()))),
            },
        }
    }
}

impl Encode for Polygon {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        let len = i32::try_from(self.points.len()).map_err(|_| ConversionError::range("polygon"))?;
        let mut buf = BytesMut::with_capacity(4 + self.points.len() * 16);
        buf.put_i32(len);
        for point in &self.points {
            point.put(&mut buf);
        }
        Ok(WireValue::binary(Self::OID, buf.freeze()))
    }
}

impl Decode for Polygon {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.payload(&[oid::POLYGON], "Polygon")?.1 {
            Payload::Binary(mut b) => {
                if b.len() < 4 {
                    return Err(ConversionError::length("Polygon", 4, b.len()));
                }
                let len = b.get_i32();
                let expected = usize::try_from(len)
                    .map_err(|_| ConversionError::invalid("negative polygon length"))?
                    * 16;
                if b.len() != expected {
                    return Err(ConversionError::length("Polygon", 4 + expected, 4 + b.len()));
                }
                let points = (0..len).map(|_| Point { x: b.get_f64(), y: b.get_f64() }).collect();
                Ok(Polygon { points })
            },
            Payload::Text(t) => {
                let invalid = || ConversionError::invalid(format!("invalid polygon {:?}", t.as_str()));
                let mut rest = t.trim().strip_prefix('(').ok_or_else(invalid)?;
                let mut points = vec![];
                loop {
                    let (point, next) = Point::parse(rest)?;
                    points.push(point);
                    let next = next.trim_start();
                    match next.strip_prefix(',') {
                        Some(next) => rest = next,
                        None if next == ")" => break,
                        None => return Err(invalid()),
                    }
                }
                Ok(Polygon { points })
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn point() {
        let value = Point::new(1.5, -2.0).encode().unwrap();
        assert_eq!(value.as_slice().map(<[u8]>::len), Some(16));
        assert_eq!(Point::decode(value).unwrap(), Point::new(1.5, -2.0));

        let text = WireValue::text(oid::POINT, "(1.5,-2)");
        assert_eq!(Point::decode(text).unwrap(), Point::new(1.5, -2.0));
        assert!(Point::decode(WireValue::text(oid::POINT, "(1.5)")).is_err());
    }

    #[test]
    fn polygon() {
        let polygon = Polygon {
            points: vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)],
        };
        let value = polygon.encode().unwrap();
        assert_eq!(value.as_slice().map(<[u8]>::len), Some(4 + 3 * 16));
        assert_eq!(Polygon::decode(value).unwrap(), polygon);

        let text = WireValue::text(oid::POLYGON, "((0,0),(1,0),(1,1))");
        assert_eq!(Polygon::decode(text).unwrap(), polygon);
        assert_eq!(polygon.to_string(), "((0,0),(1,0),(1,1))");
    }
}
