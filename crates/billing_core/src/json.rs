//! JSON codec shared by every resource type.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Failed to parse {resource}: {source}")]
pub struct ParseError {
    pub resource: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// Conversion between a resource and its vendor JSON representation.
///
/// Implemented for every `Serialize + DeserializeOwned` type, so the model
/// structs only need their serde derives.
pub trait JsonResource: Serialize + DeserializeOwned {
    fn from_json(json: &str) -> Result<Self, ParseError> {
        serde_json::from_str(json).map_err(|source| ParseError {
            resource: short_type_name::<Self>(),
            source,
        })
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        serde_json::from_slice(bytes).map_err(|source| ParseError {
            resource: short_type_name::<Self>(),
            source,
        })
    }

    /// Compact JSON with unset fields omitted.
    fn to_json(&self) -> String {
        // Derived Serialize impls over string-keyed structs cannot fail.
        serde_json::to_string(self).unwrap_or_else(|e| {
            log::error!("Failed to serialize {}: {}", short_type_name::<Self>(), e);
            String::new()
        })
    }

    fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            log::error!("Failed to serialize {}: {}", short_type_name::<Self>(), e);
            String::new()
        })
    }
}

impl<T: Serialize + DeserializeOwned> JsonResource for T {}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
