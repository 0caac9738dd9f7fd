use std::{
    fmt::{Debug, Display, Formatter, LowerHex, Result as FmtResult},
    ops::Deref,
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Wrapper type around `bytes::Bytes` that (de)serializes as a `0x` prefixed hex string.
///
/// Used for addresses, pool ids and opaque auxiliary data. Ordering and hashing follow the raw
/// bytes, so two addresses compare the same way they would on chain.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bytes(pub bytes::Bytes);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Failed to parse bytes: {0}")]
pub struct ParseBytesError(String);

impl Bytes {
    pub fn new() -> Self {
        Self(bytes::Bytes::new())
    }

    /// A byte string of `length` zero bytes.
    pub fn zero(length: usize) -> Self {
        Self::from(vec![0u8; length])
    }

    /// True if every byte is zero. An empty byte string counts as zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Left pads the byte string to `length` using `pad_byte`.
    ///
    /// Returns the bytes unchanged if they are already at least `length` long.
    pub fn lpad(&self, length: usize, pad_byte: u8) -> Self {
        if self.len() >= length {
            return self.clone();
        }
        let mut padded = vec![pad_byte; length - self.len()];
        padded.extend_from_slice(&self.0);
        Self::from(padded)
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl Debug for Bytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "Bytes(0x{})", hex::encode(self.0.as_ref()))
    }
}

impl Display for Bytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "0x{}", hex::encode(self.0.as_ref()))
    }
}

impl LowerHex for Bytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if f.alternate() {
            write!(f, "0x")?;
        }
        write!(f, "{}", hex::encode(self.0.as_ref()))
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(src: Vec<u8>) -> Self {
        Self(src.into())
    }
}

impl From<&[u8]> for Bytes {
    fn from(src: &[u8]) -> Self {
        Self(bytes::Bytes::copy_from_slice(src))
    }
}

impl<const N: usize> From<[u8; N]> for Bytes {
    fn from(src: [u8; N]) -> Self {
        Self::from(src.to_vec())
    }
}

impl From<u8> for Bytes {
    fn from(src: u8) -> Self {
        Self::from(vec![src])
    }
}

impl From<Bytes> for Vec<u8> {
    fn from(src: Bytes) -> Vec<u8> {
        src.0.to_vec()
    }
}

impl FromStr for Bytes {
    type Err = ParseBytesError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let stripped = value
            .strip_prefix("0x")
            .unwrap_or(value);
        hex::decode(stripped)
            .map(Into::into)
            .map_err(|e| ParseBytesError(format!("invalid hex '{value}': {e}")))
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Bytes::from_str(&value).map_err(serde::de::Error::custom)
    }
}
