use bytes::Bytes;
use ::time::{
    Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
    format_description::BorrowedFormatItem,
    macros::format_description,
};

use super::{ArrayElement, ConversionError, Decode, Encode, fixed};
use crate::{
    postgres::{Oid, PgType, oid},
    value::{Payload, WireValue},
};

macro_rules! pg_type {
    ($($ty:ty => $oid:ident, $array:ident;)*) => {$(
        impl PgType for $ty {
            const OID: Oid = oid::$oid;
            const ARRAY_OID: Oid = oid::$array;
        }

        impl ArrayElement for $ty { }
    )*};
}

pg_type! {
    Date => DATE, DATE_ARRAY;
    Time => TIME, TIME_ARRAY;
    PrimitiveDateTime => TIMESTAMP, TIMESTAMP_ARRAY;
    OffsetDateTime => TIMESTAMPTZ, TIMESTAMPTZ_ARRAY;
}

/// Postgres epoch, `2000-01-01`.
const PG_EPOCH_DATE: Date = {
    // source: `from_julian_day` docs
    match Date::from_julian_day(2_451_545) {
        Ok(ok) => ok,
        Err(_) => panic!("postgres epoch is a valid date"),
    }
};

const PG_EPOCH: PrimitiveDateTime = PrimitiveDateTime::new(PG_EPOCH_DATE, Time::MIDNIGHT);

const MICROS_PER_DAY: i64 = 86_400_000_000;

// ===== Text format =====

const DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

const TIME: &[BorrowedFormatItem<'_>] =
    format_description!("[hour]:[minute]:[second][optional [.[subsecond]]]");

const DATETIME: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);

/// `2000-01-01 00:00:00.123+07`, minute and second of offset are omitted when zero.
const DATETIME_TZ: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]][offset_hour sign:mandatory][optional [:[offset_minute]]][optional [:[offset_second]]]"
);

fn parse<T>(
    text: &str,
    target: &'static str,
    parse: impl FnOnce(&str) -> Result<T, ::time::error::Parse>,
) -> Result<T, ConversionError> {
    parse(text).map_err(|err| ConversionError::invalid(format!("invalid {target} {text:?}: {err}")))
}

// ===== Binary format =====

fn micros(b: &[u8], target: &'static str) -> Result<Duration, ConversionError> {
    Ok(Duration::microseconds(i64::from_be_bytes(fixed(b, target)?)))
}

fn whole_micros(duration: Duration, target: &'static str) -> Result<Bytes, ConversionError> {
    let micros = i64::try_from(duration.whole_microseconds())
        .map_err(|_| ConversionError::range(target))?;
    Ok(Bytes::copy_from_slice(&micros.to_be_bytes()))
}

impl Encode for Date {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        let days = i32::try_from((*self - PG_EPOCH_DATE).whole_days())
            .map_err(|_| ConversionError::range("date"))?;
        Ok(WireValue::binary(Self::OID, Bytes::copy_from_slice(&days.to_be_bytes())))
    }
}

impl Decode for Date {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.payload(&[oid::DATE], "Date")?.1 {
            Payload::Binary(b) => {
                let days = i32::from_be_bytes(fixed(&b, "Date")?);
                PG_EPOCH_DATE
                    .checked_add(Duration::days(days.into()))
                    .ok_or(ConversionError::range("Date"))
            },
            Payload::Text(t) => parse(&t, "date", |t| Date::parse(t, DATE)),
        }
    }
}

impl Encode for Time {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        let micros = whole_micros(*self - Time::MIDNIGHT, "time")?;
        Ok(WireValue::binary(Self::OID, micros))
    }
}

impl Decode for Time {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.payload(&[oid::TIME], "Time")?.1 {
            Payload::Binary(b) => {
                let micros = i64::from_be_bytes(fixed(&b, "Time")?);
                // postgres allows `24:00:00`, which is not representable
                if !(0..MICROS_PER_DAY).contains(&micros) {
                    return Err(ConversionError::range("Time"));
                }
                Ok(Time::MIDNIGHT + Duration::microseconds(micros))
            },
            Payload::Text(t) => parse(&t, "time", |t| Time::parse(t, TIME)),
        }
    }
}

impl Encode for PrimitiveDateTime {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        let micros = whole_micros(*self - PG_EPOCH, "timestamp")?;
        Ok(WireValue::binary(Self::OID, micros))
    }
}

impl Decode for PrimitiveDateTime {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.payload(&[oid::TIMESTAMP], "PrimitiveDateTime")?.1 {
            Payload::Binary(b) => PG_EPOCH
                .checked_add(micros(&b, "PrimitiveDateTime")?)
                .ok_or(ConversionError::range("PrimitiveDateTime")),
            Payload::Text(t) => parse(&t, "timestamp", |t| PrimitiveDateTime::parse(t, DATETIME)),
        }
    }
}

impl Encode for OffsetDateTime {
    fn encode(&self) -> Result<WireValue, ConversionError> {
        let micros = whole_micros(*self - PG_EPOCH.assume_utc(), "timestamptz")?;
        Ok(WireValue::binary(Self::OID, micros))
    }
}

impl Decode for OffsetDateTime {
    fn decode(value: WireValue) -> Result<Self, ConversionError> {
        match value.payload(&[oid::TIMESTAMPTZ], "OffsetDateTime")?.1 {
            Payload::Binary(b) => PG_EPOCH
                .assume_offset(UtcOffset::UTC)
                .checked_add(micros(&b, "OffsetDateTime")?)
                .ok_or(ConversionError::range("OffsetDateTime")),
            Payload::Text(t) => parse(&t, "timestamptz", |t| OffsetDateTime::parse(t, DATETIME_TZ)),
        }
    }
}
