//! Content fingerprints
//!
//! Provides [`Fingerprint`], a 32-byte Blake3 digest used to compare document
//! states across snapshots without shipping the whole document around.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content fingerprint (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Create fingerprint from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FingerprintError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| FingerprintError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Fingerprint arbitrary bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Fingerprint a serializable value through its JSON encoding
    ///
    /// Maps must be ordered (`BTreeMap`) for the result to be stable.
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn of<T>(value: &T) -> Result<Self, FingerprintError>
    where
        T: serde::Serialize,
    {
        let json = serde_json::to_vec(value)?;
        Ok(Self::compute(&json))
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl serde::Serialize for Fingerprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors produced while building or parsing fingerprints
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// Raw bytes of the wrong size
    #[error("invalid fingerprint length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex decoding failed
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// JSON encoding of the fingerprinted value failed
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn compute_is_deterministic() {
        assert_eq!(Fingerprint::compute(b"abc"), Fingerprint::compute(b"abc"));
        assert_ne!(Fingerprint::compute(b"abc"), Fingerprint::compute(b"abd"));
    }

    #[test]
    fn hex_roundtrip() {
        let fp = Fingerprint::compute(b"topology");
        let parsed: Fingerprint = fp.to_string().parse().unwrap();
        assert_eq!(parsed, fp);
        assert_eq!(fp.short().len(), 16);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let result = Fingerprint::from_slice(&[0u8; 12]);
        assert!(matches!(
            result,
            Err(FingerprintError::InvalidLength { expected: 32, actual: 12 })
        ));
    }

    #[test]
    fn ordered_maps_fingerprint_identically() {
        let mut a = BTreeMap::new();
        a.insert("x", 1);
        a.insert("y", 2);
        let mut b = BTreeMap::new();
        b.insert("y", 2);
        b.insert("x", 1);
        assert_eq!(Fingerprint::of(&a).unwrap(), Fingerprint::of(&b).unwrap());
    }
}
