//! Numeric and chain-name wire codecs
//!
//! Contract values travel as decimal (or `0x` hex) strings and timestamps are
//! whole seconds on-chain but milliseconds in this crate's API.

use alloy::primitives::{FixedBytes, U256};

use crate::error::PorterError;

/// Parse a strict base-10 integer string into an amount
pub fn parse_amount(input: &str) -> Result<U256, PorterError> {
    if input.is_empty() {
        return Err(PorterError::malformed(input, "empty string"));
    }
    if !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PorterError::malformed(input, "not a base-10 integer"));
    }
    U256::from_str_radix(input, 10).map_err(|e| PorterError::malformed(input, e.to_string()))
}

/// Parse either a `0x`-prefixed hex quantity or a decimal string
pub fn parse_quantity(input: &str) -> Result<U256, PorterError> {
    match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(digits) => {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(PorterError::malformed(input, "not a hex quantity"));
            }
            U256::from_str_radix(digits, 16)
                .map_err(|e| PorterError::malformed(input, e.to_string()))
        }
        None => parse_amount(input),
    }
}

/// Parse a decimal string into a `u64`
pub fn parse_u64(input: &str) -> Result<u64, PorterError> {
    let value = parse_amount(input)?;
    u64::try_from(value).map_err(|_| PorterError::malformed(input, "does not fit in 64 bits"))
}

/// Narrow an on-chain quantity to `u64`
pub fn to_u64(value: U256) -> Result<u64, PorterError> {
    u64::try_from(value)
        .map_err(|_| PorterError::malformed(&value.to_string(), "does not fit in 64 bits"))
}

pub fn seconds_to_millis(secs: u64) -> u64 {
    secs.saturating_mul(1000)
}

/// Rounds half-up to whole seconds
pub fn millis_to_seconds(ms: u64) -> u64 {
    ms / 1000 + u64::from(ms % 1000 >= 500)
}

/// Encode a chain name (e.g. `"ETH"`) as the contracts' right-padded `bytes8`
pub fn encode_chain_name(name: &str) -> Result<FixedBytes<8>, PorterError> {
    let raw = name.as_bytes();
    if raw.is_empty() || raw.len() > 8 {
        return Err(PorterError::InvalidChainName {
            name: name.to_string(),
            reason: format!("must be 1 to 8 bytes, got {}", raw.len()),
        });
    }
    let mut out = [0u8; 8];
    out[..raw.len()].copy_from_slice(raw);
    Ok(FixedBytes(out))
}

/// Decode a `bytes8` chain name, dropping the zero padding
pub fn decode_chain_name(raw: FixedBytes<8>) -> Result<String, PorterError> {
    let end = raw.0.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8(raw.0[..end].to_vec()).map_err(|e| PorterError::InvalidChainName {
        name: format!("0x{}", hex::encode(raw.0)),
        reason: e.to_string(),
    })
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Text(String),
    Int(u64),
}

impl RawNumber {
    fn into_u256(self) -> Result<U256, PorterError> {
        match self {
            RawNumber::Text(s) => parse_quantity(&s),
            RawNumber::Int(n) => Ok(U256::from(n)),
        }
    }
}

/// Serde adapter: `U256` as a decimal string (hex or JSON integers accepted on input)
pub mod decimal {
    use super::RawNumber;
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        RawNumber::deserialize(deserializer)?
            .into_u256()
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: optional `U256` as a decimal string
pub mod decimal_opt {
    use super::RawNumber;
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<U256>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        Option::<RawNumber>::deserialize(deserializer)?
            .map(RawNumber::into_u256)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: `u64` as a decimal string
pub mod decimal_u64 {
    use super::RawNumber;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let value = RawNumber::deserialize(deserializer)?
            .into_u256()
            .map_err(serde::de::Error::custom)?;
        super::to_u64(value).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: `Vec<U256>` as decimal strings
pub mod decimal_seq {
    use super::RawNumber;
    use alloy::primitives::U256;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&value.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<U256>, D::Error> {
        Vec::<RawNumber>::deserialize(deserializer)?
            .into_iter()
            .map(RawNumber::into_u256)
            .collect::<Result<_, _>>()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("20000").unwrap(), U256::from(20_000u64));
        assert_eq!(parse_amount("0").unwrap(), U256::ZERO);

        // 2^256 - 1
        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(parse_amount(max).unwrap(), U256::MAX);
    }

    #[test]
    fn test_parse_amount_rejects_non_decimal() {
        for bad in ["", "-1", "1.5", "0x10", " 1", "1e18", "abc"] {
            let err = parse_amount(bad).unwrap_err();
            assert!(
                matches!(err, PorterError::MalformedNumber { .. }),
                "{:?} should be malformed",
                bad
            );
        }

        let overflow =
            "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert!(parse_amount(overflow).is_err());
    }

    #[test]
    fn test_parse_quantity_hex_and_decimal() {
        assert_eq!(parse_quantity("0x10").unwrap(), U256::from(16u64));
        assert_eq!(parse_quantity("16").unwrap(), U256::from(16u64));
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_parse_u64_bounds() {
        assert_eq!(parse_u64("18446744073709551615").unwrap(), u64::MAX);
        assert!(parse_u64("18446744073709551616").is_err());
    }

    #[test]
    fn test_time_scaling() {
        assert_eq!(seconds_to_millis(1_530_000_000), 1_530_000_000_000);
        assert_eq!(millis_to_seconds(1_530_000_000_000), 1_530_000_000);

        // Half-up rounding
        assert_eq!(millis_to_seconds(1_499), 1);
        assert_eq!(millis_to_seconds(1_500), 2);
        assert_eq!(millis_to_seconds(499), 0);
        assert_eq!(millis_to_seconds(u64::MAX), u64::MAX / 1000 + 1);
    }

    #[test]
    fn test_chain_name_bytes8() {
        let encoded = encode_chain_name("ETC").unwrap();
        assert_eq!(encoded.0, [0x45, 0x54, 0x43, 0, 0, 0, 0, 0]);
        assert_eq!(decode_chain_name(encoded).unwrap(), "ETC");

        assert!(encode_chain_name("").is_err());
        assert!(encode_chain_name("NINEBYTES").is_err());
        assert!(encode_chain_name("EIGHTBYT").is_ok());
    }

    #[test]
    fn test_decimal_serde() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "decimal")]
            amount: U256,
            #[serde(with = "decimal_seq")]
            supply: Vec<U256>,
            #[serde(with = "decimal_u64")]
            sequence: u64,
        }

        let parsed: Wrapper =
            serde_json::from_str(r#"{"amount":"0x3e8","supply":["1",2],"sequence":"9"}"#)
                .unwrap();
        assert_eq!(parsed.amount, U256::from(1000u64));
        assert_eq!(parsed.supply, vec![U256::from(1u64), U256::from(2u64)]);
        assert_eq!(parsed.sequence, 9);

        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(
            json,
            r#"{"amount":"1000","supply":["1","2"],"sequence":"9"}"#
        );
    }
}
