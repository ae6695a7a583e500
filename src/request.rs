//! Identity of a level-update request.
//!
//! Request ids are arbitrary-precision non-negative integers (on-chain they are
//! usually `uint256`). Equality is numeric: `"7"`, `"0007"` and `"0x07"` name the
//! same request.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(BigUint);

impl RequestId {
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(bytes))
    }

    /// Parse a decimal or `0x`-prefixed hexadecimal string.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidArgument("request id is empty".into()));
        }
        let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(digits) => (digits, 16),
            None => (s, 10),
        };
        // BigUint also takes `+` and `_`; an id is plain digits only.
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(Error::InvalidArgument(format!(
                "request id {s:?} is not a non-negative integer"
            )));
        }
        BigUint::parse_bytes(digits.as_bytes(), radix)
            .map(Self)
            .ok_or_else(|| Error::InvalidArgument(format!("request id {s:?} failed to parse")))
    }

    /// Minimal big-endian bytes; zero is `[0]`.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.bits() == 0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", self.0.to_str_radix(16))
    }
}

impl From<BigUint> for RequestId {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl FromStr for RequestId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RequestId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0.to_str_radix(10)
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u128> for RequestId {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U256_MAX_DEC: &str =
        "115792089237316195423570985008687907853269984665640564039457584007913129639935";

    #[test]
    fn equality_is_numeric() {
        let a: RequestId = "7".parse().expect("decimal");
        let b: RequestId = "0007".parse().expect("padded decimal");
        let c: RequestId = "0x07".parse().expect("hex");
        let d = RequestId::from(7u64);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, d);
        assert_ne!(a, RequestId::from(8u64));
    }

    #[test]
    fn parses_values_wider_than_u128() {
        let dec = RequestId::parse(U256_MAX_DEC).expect("u256 max");
        let hex = RequestId::parse(&format!("0x{}", "ff".repeat(32))).expect("u256 max hex");
        assert_eq!(dec, hex);
        assert_eq!(dec.to_be_bytes().len(), 32);
        assert_eq!(dec.to_string(), U256_MAX_DEC);
    }

    #[test]
    fn display_matches_native_integers() {
        assert_eq!(RequestId::from(0u64).to_string(), "0");
        assert_eq!(RequestId::from(1_000_000u64).to_string(), "1000000");
        assert_eq!(
            RequestId::from(u128::MAX).to_string(),
            "340282366920938463463374607431768211455"
        );
        assert_eq!(RequestId::from(0x1abu64).to_hex(), "0x1ab");
        assert_eq!(RequestId::from(0u64).to_hex(), "0x0");
        assert!(RequestId::from(0u64).is_zero());
        assert_eq!(RequestId::from_be_bytes(&[0, 0, 1, 0]), RequestId::from(256u64));
    }

    #[test]
    fn odd_length_hex_is_accepted() {
        let odd = RequestId::parse("0xabc").expect("odd hex");
        assert_eq!(odd, RequestId::from(0xabcu64));
    }

    #[test]
    fn rejects_malformed_identities() {
        for bad in ["", "   ", "-1", "+1", "1_000", "12a", "0x", "0xzz", "0x_1", "1.5"] {
            let err = RequestId::parse(bad).expect_err(bad);
            assert!(matches!(err, Error::InvalidArgument(_)), "{bad}: {err:?}");
        }
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let id = RequestId::from(42u64);
        assert_eq!(serde_json::to_string(&id).expect("serialize"), r#""42""#);
        let back: RequestId = serde_json::from_str(r#""0x2a""#).expect("deserialize");
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RequestId>(r#""nope""#).is_err());
    }
}
