//! Typed value codecs for settings fields serde_json can't represent natively
//!
//! A codec converts one concrete type to and from a text token. Codecs are
//! collected in a [`CodecRegistry`], which is installed for the duration of a
//! single serialize/deserialize call via [`CodecRegistry::scope`]. Settings
//! fields opt in with `#[serde(with = "crate::config::codec::registered")]`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("no codec registered for type {type_name}")]
    Unregistered { type_name: &'static str },

    #[error("no codec registry active on this thread")]
    NoActiveRegistry,

    #[error("codec '{codec}' cannot handle a value of type {expected}")]
    TypeMismatch {
        codec: &'static str,
        expected: &'static str,
    },

    #[error("codec '{codec}' rejected token '{token}': {reason}")]
    Malformed {
        codec: &'static str,
        token: String,
        reason: String,
    },
}

/// Bidirectional conversion between one concrete type and a text token
pub trait ValueCodec: Send + Sync {
    /// Short name used in error messages
    fn name(&self) -> &'static str;

    /// True only for the exact type this codec converts
    fn can_handle(&self, type_id: TypeId) -> bool;

    /// Render a value in its canonical textual form
    fn encode(&self, value: &dyn Any) -> Result<String, CodecError>;

    /// Parse a token back into the typed value.
    /// Absent or blank tokens decode to `None`.
    fn decode(&self, token: Option<&str>) -> Result<Option<Box<dyn Any>>, CodecError>;
}

/// Stores IP addresses as their dotted (v4) or colon (v6) string
#[derive(Debug, Default, Clone, Copy)]
pub struct IpAddrCodec;

impl ValueCodec for IpAddrCodec {
    fn name(&self) -> &'static str {
        "ip-address"
    }

    fn can_handle(&self, type_id: TypeId) -> bool {
        type_id == TypeId::of::<IpAddr>()
    }

    fn encode(&self, value: &dyn Any) -> Result<String, CodecError> {
        value
            .downcast_ref::<IpAddr>()
            .map(IpAddr::to_string)
            .ok_or(CodecError::TypeMismatch {
                codec: self.name(),
                expected: type_name::<IpAddr>(),
            })
    }

    fn decode(&self, token: Option<&str>) -> Result<Option<Box<dyn Any>>, CodecError> {
        let token = match token.map(str::trim) {
            None | Some("") => return Ok(None),
            Some(token) => token,
        };

        let addr = token.parse::<IpAddr>().map_err(|e| CodecError::Malformed {
            codec: self.name(),
            token: token.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(Box::new(addr)))
    }
}

/// Ordered set of codecs; the first codec that handles a type wins
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn ValueCodec>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.codecs.iter().map(|codec| codec.name()))
            .finish()
    }
}

impl CodecRegistry {
    /// Empty registry (typed fields will not round-trip)
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every codec the settings file needs
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(IpAddrCodec);
        registry
    }

    pub fn register(&mut self, codec: impl ValueCodec + 'static) {
        self.codecs.push(Arc::new(codec));
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    pub fn handles<T: Any>(&self) -> bool {
        self.find::<T>().is_ok()
    }

    pub fn encode<T: Any>(&self, value: &T) -> Result<String, CodecError> {
        self.find::<T>()?.encode(value)
    }

    pub fn decode<T: Any>(&self, token: Option<&str>) -> Result<Option<T>, CodecError> {
        let codec = self.find::<T>()?;
        match codec.decode(token)? {
            None => Ok(None),
            Some(boxed) => boxed
                .downcast::<T>()
                .map(|value| Some(*value))
                .map_err(|_| CodecError::TypeMismatch {
                    codec: codec.name(),
                    expected: type_name::<T>(),
                }),
        }
    }

    /// Run `f` with this registry visible to the `registered` serde adapter
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        ACTIVE.with(|active| active.borrow_mut().push(self.clone()));
        let _guard = ScopeGuard;
        f()
    }

    fn find<T: Any>(&self) -> Result<&Arc<dyn ValueCodec>, CodecError> {
        let type_id = TypeId::of::<T>();
        self.codecs
            .iter()
            .find(|codec| codec.can_handle(type_id))
            .ok_or(CodecError::Unregistered {
                type_name: type_name::<T>(),
            })
    }
}

thread_local! {
    // Stack so nested scopes restore the outer registry
    static ACTIVE: RefCell<Vec<CodecRegistry>> = const { RefCell::new(Vec::new()) };
}

struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            active.borrow_mut().pop();
        });
    }
}

fn with_active<R>(
    f: impl FnOnce(&CodecRegistry) -> Result<R, CodecError>,
) -> Result<R, CodecError> {
    ACTIVE.with(|active| match active.borrow().last() {
        Some(registry) => f(registry),
        None => Err(CodecError::NoActiveRegistry),
    })
}

/// Serde adapter for `Option<T>` fields routed through the active registry
pub mod registered {
    use super::with_active;
    use serde::{de, ser, Deserialize, Deserializer, Serializer};
    use std::any::Any;

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Any,
        S: Serializer,
    {
        match value {
            None => serializer.serialize_none(),
            Some(value) => {
                let token = with_active(|registry| registry.encode(value))
                    .map_err(ser::Error::custom)?;
                serializer.serialize_some(&token)
            }
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: Any,
        D: Deserializer<'de>,
    {
        let token = Option::<String>::deserialize(deserializer)?;
        with_active(|registry| registry.decode::<T>(token.as_deref())).map_err(de::Error::custom)
    }
}

/// JSON reader/writer that consults a codec registry
#[derive(Debug, Clone)]
pub struct JsonFormat {
    codecs: CodecRegistry,
}

impl JsonFormat {
    pub fn new(codecs: CodecRegistry) -> Self {
        Self { codecs }
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn from_slice<T: DeserializeOwned>(&self, bytes: &[u8]) -> serde_json::Result<T> {
        self.codecs.scope(|| serde_json::from_slice(bytes))
    }

    pub fn to_string_pretty<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        self.codecs.scope(|| serde_json::to_string_pretty(value))
    }
}
