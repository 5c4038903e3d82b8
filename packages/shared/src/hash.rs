use sha2::{
    digest::{generic_array::GenericArray, OutputSizeUser},
    Digest, Sha256,
};
use std::fmt::Display;

#[derive(thiserror::Error, Debug)]
pub enum Sha256HashError {
    #[error("Wrong length for a SHA256 hash, expected 32, actual {actual}")]
    WrongLength { actual: usize },
    #[error("Invalid hex encoding for hash in {hex:?}: {source}")]
    InvalidHexEncoding {
        source: hex::FromHexError,
        hex: String,
    },
}

/// A binary value representing a SHA256 hash.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Sha256Hash(pub GenericArray<u8, <Sha256 as OutputSizeUser>::OutputSize>);

impl Sha256Hash {
    pub fn hash(input: impl AsRef<[u8]>) -> Self {
        Sha256Hash(Sha256::digest(input.as_ref()))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Sha256HashError> {
        if bytes.len() == 32 {
            Ok(Sha256Hash(*GenericArray::from_slice(bytes)))
        } else {
            Err(Sha256HashError::WrongLength {
                actual: bytes.len(),
            })
        }
    }

    pub fn from_hex(s: &str) -> Result<Self, Sha256HashError> {
        let bytes = hex::decode(s).map_err(|source| Sha256HashError::InvalidHexEncoding {
            source,
            hex: s.to_owned(),
        })?;
        Self::from_slice(&bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl Display for Sha256Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0.as_slice()))
    }
}

impl std::fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl serde::Serialize for Sha256Hash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0.as_slice()))
    }
}

impl<'de> serde::Deserialize<'de> for Sha256Hash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        let s = String::deserialize(deserializer)?;
        Sha256Hash::from_hex(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable() {
        assert_eq!(Sha256Hash::hash(b"abc"), Sha256Hash::hash(b"abc"));
        assert_ne!(Sha256Hash::hash(b"abc"), Sha256Hash::hash(b"abd"));
    }

    #[test]
    fn hex_roundtrip() {
        let hash = Sha256Hash::hash(b"roundtrip");
        assert_eq!(Sha256Hash::from_hex(&hash.to_string()).unwrap(), hash);
    }

    #[test]
    fn rejects_wrong_length() {
        Sha256Hash::from_slice(&[0u8; 31]).unwrap_err();
        Sha256Hash::from_slice(&[0u8; 33]).unwrap_err();
    }
}
