use k256::ecdsa::signature::{Signer, Verifier};
use std::{fmt::Display, str::FromStr};

/// Newtype wrapper around [k256::PublicKey] to provide consistent serialization.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PublicKey(k256::PublicKey);

#[derive(thiserror::Error, Debug)]
pub enum PublicKeyError {
    #[error("Invalid hex encoding for public key in {hex:?}: {source}")]
    InvalidHexEncoding {
        source: hex::FromHexError,
        hex: String,
    },
    #[error("Could not parse a public key from {bytes:?}: {source}")]
    FromBytes {
        source: k256::elliptic_curve::Error,
        bytes: Vec<u8>,
    },
    #[error("Signature verification failed for public key {pubkey}")]
    BadSignature { pubkey: Box<PublicKey> },
}

impl PublicKey {
    pub fn as_bytes(&self) -> Box<[u8]> {
        self.0.to_sec1_bytes()
    }

    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, PublicKeyError> {
        let bytes = bytes.as_ref();
        k256::PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|source| PublicKeyError::FromBytes {
                source,
                bytes: bytes.to_owned(),
            })
    }

    /// Check that `signature` is a valid signature over `msg` by this key.
    pub fn verify(
        &self,
        msg: impl AsRef<[u8]>,
        signature: &Signature,
    ) -> Result<(), PublicKeyError> {
        k256::ecdsa::VerifyingKey::from(&self.0)
            .verify(msg.as_ref(), &signature.0)
            .map_err(|_| PublicKeyError::BadSignature {
                pubkey: Box::new(*self),
            })
    }
}

impl From<k256::PublicKey> for PublicKey {
    fn from(value: k256::PublicKey) -> Self {
        PublicKey(value)
    }
}

impl From<k256::ecdsa::VerifyingKey> for PublicKey {
    fn from(value: k256::ecdsa::VerifyingKey) -> Self {
        k256::PublicKey::from(value).into()
    }
}

impl serde::Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for PublicKey {
    type Err = PublicKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|source| PublicKeyError::InvalidHexEncoding {
            source,
            hex: s.to_owned(),
        })?;
        PublicKey::from_bytes(&bytes)
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0.to_sec1_bytes()))
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_sec1_bytes().hash(state)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SecretKeyError {
    #[error("Signing failed: {source}")]
    SigningFailed { source: k256::ecdsa::Error },
    #[error("Invalid hex when parsing secret key (contents redacted for privacy)")]
    InvalidHex,
    #[error("Invalid bytes when parsing a secret key: {source}")]
    InvalidBytes { source: k256::elliptic_curve::Error },
}

#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(k256::SecretKey);

impl SecretKey {
    pub fn public_key(&self) -> PublicKey {
        self.0.public_key().into()
    }

    pub fn sign(&self, msg: impl AsRef<[u8]>) -> Result<Signature, SecretKeyError> {
        k256::ecdsa::SigningKey::from(&self.0)
            .try_sign(msg.as_ref())
            .map(Signature)
            .map_err(|source| SecretKeyError::SigningFailed { source })
    }

    /// Produce a random secret key using [rand::thread_rng]
    pub fn random() -> Self {
        Self::random_with(&mut rand::thread_rng())
    }

    pub fn random_with(rng: &mut rand::rngs::ThreadRng) -> Self {
        SecretKey(k256::SecretKey::random(rng))
    }

    pub fn from_hex(hex: &str) -> Result<Self, SecretKeyError> {
        let bytes = ::hex::decode(hex).map_err(|_| SecretKeyError::InvalidHex)?;
        k256::SecretKey::from_slice(&bytes)
            .map(SecretKey)
            .map_err(|source| SecretKeyError::InvalidBytes { source })
    }

    /// Reveal the secret key contents as a hex string
    ///
    /// This could be a Display impl, but intentionally making it
    /// more difficult so we don't accidentally leak secret keys.
    pub fn reveal_as_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }
}

impl FromStr for SecretKey {
    type Err = SecretKeyError;

    fn from_str(s: &str) -> Result<Self, SecretKeyError> {
        SecretKey::from_hex(s)
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("SecretKey(contents redacted)")
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SignatureError {
    #[error("Invalid hex encoding for signature in {hex:?}: {source}")]
    InvalidHexEncoding {
        source: hex::FromHexError,
        hex: String,
    },
    #[error("Invalid signature in {bytes:?}: {source}")]
    InvalidSignature {
        source: k256::ecdsa::Error,
        bytes: Vec<u8>,
    },
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(k256::ecdsa::Signature);

impl PartialOrd for Signature {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Signature {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.to_bytes().cmp(&other.0.to_bytes())
    }
}

impl Signature {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    pub fn from_hex(s: &str) -> Result<Signature, SignatureError> {
        let bytes = hex::decode(s).map_err(|source| SignatureError::InvalidHexEncoding {
            source,
            hex: s.to_owned(),
        })?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Signature, SignatureError> {
        k256::ecdsa::Signature::from_slice(bytes)
            .map(Signature)
            .map_err(|source| SignatureError::InvalidSignature {
                source,
                bytes: bytes.to_owned(),
            })
    }
}

impl From<k256::ecdsa::Signature> for Signature {
    fn from(sig: k256::ecdsa::Signature) -> Self {
        Signature(sig)
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
