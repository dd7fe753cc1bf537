//! Codec registry for persisted kinds
//!
//! A `Scheme` is built once at process start, populated with every kind the
//! broker persists, and passed to the stores that encode or decode objects.
//! Encoded objects are JSON documents tagged with `apiVersion` and `kind`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use osb_types::ServiceInstance;

use crate::error::{StoreError, StoreResult};

/// A type that can be persisted through a [`Scheme`]
pub trait Resource: Serialize + DeserializeOwned {
    const API_VERSION: &'static str;
    const KIND: &'static str;
}

impl Resource for ServiceInstance {
    const API_VERSION: &'static str = "broker.osb.io/v1alpha1";
    const KIND: &'static str = "ServiceInstance";
}

/// Registered kinds, keyed by kind name
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    kinds: HashMap<&'static str, &'static str>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` so it can be encoded and decoded
    pub fn register<T: Resource>(&mut self) -> &mut Self {
        self.kinds.insert(T::KIND, T::API_VERSION);
        self
    }

    pub fn is_registered<T: Resource>(&self) -> bool {
        self.kinds.get(T::KIND) == Some(&T::API_VERSION)
    }

    /// Serialize `object` into a tagged JSON document
    pub fn encode<T: Resource>(&self, object: &T) -> StoreResult<Vec<u8>> {
        self.ensure_registered::<T>()?;

        let mut value = serde_json::to_value(object)?;
        let map = value.as_object_mut().ok_or_else(|| {
            StoreError::Codec(format!("{} does not encode to a JSON object", T::KIND))
        })?;
        map.insert("apiVersion".into(), Value::String(T::API_VERSION.into()));
        map.insert("kind".into(), Value::String(T::KIND.into()));

        Ok(serde_json::to_vec(&value)?)
    }

    /// Deserialize a tagged document, checking its kind and version
    pub fn decode<T: Resource>(&self, data: &[u8]) -> StoreResult<T> {
        self.ensure_registered::<T>()?;

        let mut value: Value = serde_json::from_slice(data)?;
        let map = value
            .as_object_mut()
            .ok_or_else(|| StoreError::Codec("encoded object is not a JSON object".into()))?;

        let kind = map.remove("kind");
        let api_version = map.remove("apiVersion");
        match (kind.as_ref().and_then(Value::as_str), api_version.as_ref().and_then(Value::as_str)) {
            (Some(k), Some(v)) if k == T::KIND && v == T::API_VERSION => {}
            (k, v) => {
                return Err(StoreError::Codec(format!(
                    "expected {}/{}, found {}/{}",
                    T::API_VERSION,
                    T::KIND,
                    v.unwrap_or("<none>"),
                    k.unwrap_or("<none>")
                )))
            }
        }

        Ok(serde_json::from_value(value)?)
    }

    fn ensure_registered<T: Resource>(&self) -> StoreResult<()> {
        if self.is_registered::<T>() {
            Ok(())
        } else {
            Err(StoreError::Codec(format!(
                "kind {} is not registered in the scheme",
                T::KIND
            )))
        }
    }
}

/// Scheme holding every kind the broker persists
pub fn broker_scheme() -> Scheme {
    let mut scheme = Scheme::new();
    scheme.register::<ServiceInstance>();
    scheme
}
