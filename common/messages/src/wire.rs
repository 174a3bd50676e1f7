use std::fmt;
use std::fmt::Write as _;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// A calendar date serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WireDate(pub Date);

impl Serialize for WireDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = self
            .0
            .format(DATE_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

impl<'de> Deserialize<'de> for WireDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, DATE_FORMAT)
            .map(WireDate)
            .map_err(de::Error::custom)
    }
}

impl From<Date> for WireDate {
    fn from(value: Date) -> Self {
        WireDate(value)
    }
}

/// A byte string serialized as uppercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HexBytes(pub Vec<u8>);

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = String::with_capacity(self.0.len() * 2);
        for byte in &self.0 {
            write!(out, "{byte:02X}").expect("writing to a String never fails");
        }
        serializer.serialize_str(&out)
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;
        impl de::Visitor<'_> for Visitor {
            type Value = HexBytes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an uppercase hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<HexBytes, E> {
                if v.len() % 2 != 0 {
                    return Err(de::Error::custom("odd-length hex string"));
                }
                let mut bytes = Vec::with_capacity(v.len() / 2);
                for chunk in v.as_bytes().chunks(2) {
                    let pair = std::str::from_utf8(chunk).map_err(de::Error::custom)?;
                    bytes.push(u8::from_str_radix(pair, 16).map_err(de::Error::custom)?);
                }
                Ok(HexBytes(bytes))
            }
        }
        deserializer.deserialize_str(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn date_round_trips_through_json() {
        let wire = WireDate(date!(2026 - 07 - 28));
        let json = serde_json::to_string(&wire).unwrap();
        assert_eq!(json, "\"2026-07-28\"");
        let back: WireDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wire);
    }

    #[test]
    fn hex_bytes_round_trip() {
        let wire = HexBytes(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let json = serde_json::to_string(&wire).unwrap();
        assert_eq!(json, "\"DEADBEEF\"");
        let back: HexBytes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wire);
    }
}
