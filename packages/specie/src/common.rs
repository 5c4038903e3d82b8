/// Common helper functions and utilities.
use std::{fmt::Display, sync::OnceLock};

use crate::*;

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging system.
///
/// This leverages the tracing crate. If verbose is enabled,
/// debug messages for both the specie crate itself, and if provided
/// the local crate, will be logged.
pub fn init_logger(verbose: bool, local_crate_name: Option<&str>) {
    static LOGGER_SETUP: OnceLock<()> = OnceLock::new();
    LOGGER_SETUP.get_or_init(|| {
        let env_filter = if verbose {
            match local_crate_name {
                None => format!("{}=debug,info", env!("CARGO_CRATE_NAME")),
                Some(name) => format!("{}=debug,{name}=debug,info", env!("CARGO_CRATE_NAME")),
            }
            .parse()
            .unwrap()
        } else {
            EnvFilter::from_default_env().add_directive(Level::INFO.into())
        };

        tracing_subscriber::registry()
            .with(
                fmt::Layer::default()
                    .log_internal_errors(true)
                    .and_then(env_filter),
            )
            .init();
        tracing::info!("Initialized Logging");
    });
}

/// Tagged, consistent-binary JSON
///
/// JSON data in a consistent format, serialized as a JSON string, with the
/// parsed value and its hash available as well.
///
/// Equality is based on serialized representation only.
#[derive(Clone)]
pub struct TaggedJson<T> {
    serialized: String,
    hash: Sha256Hash,
    value: T,
}

impl<T: serde::Serialize> TaggedJson<T> {
    pub fn new(value: T) -> Result<Self, serde_json::Error> {
        let serialized = serde_json::to_string(&value)?;
        Ok(TaggedJson {
            hash: Sha256Hash::hash(&serialized),
            serialized,
            value,
        })
    }
}

impl<T> TaggedJson<T> {
    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn as_inner(&self) -> &T {
        &self.value
    }

    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.serialized.as_bytes()
    }

    pub fn hash(&self) -> Sha256Hash {
        self.hash
    }
}

impl<T: serde::de::DeserializeOwned> TaggedJson<T> {
    pub fn try_from_string(serialized: String) -> Result<Self, serde_json::Error> {
        let value = serde_json::from_str(&serialized)?;
        Ok(TaggedJson {
            hash: Sha256Hash::hash(&serialized),
            serialized,
            value,
        })
    }
}

impl<T> PartialEq for TaggedJson<T> {
    fn eq(&self, other: &Self) -> bool {
        self.serialized == other.serialized
    }
}

impl<T> Eq for TaggedJson<T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for TaggedJson<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TaggedJson")
            .field("hash", &self.hash)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> Display for TaggedJson<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.serialized)
    }
}

impl<T> serde::Serialize for TaggedJson<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.serialized)
    }
}

impl<'de, T: serde::de::DeserializeOwned> serde::Deserialize<'de> for TaggedJson<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let serialized = String::deserialize(deserializer)?;
        Self::try_from_string(serialized).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq, Debug)]
    struct Test {
        field1: bool,
        field2: u32,
        field3: String,
    }

    #[test]
    fn test_tagged_json() {
        let t = Test {
            field1: false,
            field2: 23,
            field3: "hello there".to_owned(),
        };
        let tagged = TaggedJson::new(t.clone()).unwrap();
        assert_eq!(tagged.as_inner(), &t);

        let reparsed: TaggedJson<Test> =
            TaggedJson::try_from_string(tagged.as_str().to_owned()).unwrap();
        assert_eq!(reparsed, tagged);
        assert_eq!(reparsed.hash(), tagged.hash());
    }

    #[test]
    fn hash_tracks_serialized_form() {
        let a = TaggedJson::new(Test {
            field1: true,
            field2: 1,
            field3: "a".to_owned(),
        })
        .unwrap();
        let b = TaggedJson::new(Test {
            field1: true,
            field2: 2,
            field3: "a".to_owned(),
        })
        .unwrap();
        assert_ne!(a.hash(), b.hash());
    }
}
