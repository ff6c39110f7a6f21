//! Gesture bindings: recorded reference poses and the keys they trigger.

use std::fmt;

use serde::{
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use thiserror::Error;

use crate::landmark::NormalizedPose;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("binding label must not be empty")]
    EmptyLabel,
    #[error("bound key of '{label}' must not be empty")]
    EmptyKey { label: String },
}

/// A recorded reference pose, stored under a label and bound to a key action.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    label: String,
    pose: NormalizedPose,
    key: String,
}

impl Binding {
    /// Creates a binding after checking that `label` and `key` are non-blank.
    ///
    /// Surrounding whitespace is trimmed from both. `key` is stored verbatim otherwise; whether it
    /// names a pressable key is decided when it is pressed (see [`KeyAction`]).
    ///
    /// [`KeyAction`]: crate::key::KeyAction
    pub fn new(
        label: impl Into<String>,
        pose: NormalizedPose,
        key: impl Into<String>,
    ) -> Result<Self, BindingError> {
        let label = label.into().trim().to_string();
        if label.is_empty() {
            return Err(BindingError::EmptyLabel);
        }
        let key = key.into();
        // A lone space is a valid printable key and must survive trimming.
        let key = if key == " " {
            key
        } else {
            key.trim().to_string()
        };
        if key.is_empty() {
            return Err(BindingError::EmptyKey { label });
        }

        Ok(Self { label, pose, key })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pose(&self) -> &NormalizedPose {
        &self.pose
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// The set of bindings available for matching, keyed by label.
///
/// Iteration order is insertion order. Inserting a binding under an existing label replaces the
/// old binding in its original position.
///
/// Serializes to a map of `label -> {"landmarks": [[x, y, z], ...], "bound_key": key}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingSet {
    bindings: Vec<Binding>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Adds `binding`, returning the binding it replaced, if any.
    pub fn insert(&mut self, binding: Binding) -> Option<Binding> {
        match self.position(binding.label()) {
            Some(i) => Some(std::mem::replace(&mut self.bindings[i], binding)),
            None => {
                self.bindings.push(binding);
                None
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&Binding> {
        self.position(label).map(|i| &self.bindings[i])
    }

    pub fn remove(&mut self, label: &str) -> Option<Binding> {
        self.position(label).map(|i| self.bindings.remove(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> + '_ {
        self.bindings.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.bindings.iter().map(Binding::label)
    }

    fn position(&self, label: &str) -> Option<usize> {
        self.bindings.iter().position(|b| b.label == label)
    }
}

impl FromIterator<Binding> for BindingSet {
    fn from_iter<T: IntoIterator<Item = Binding>>(iter: T) -> Self {
        let mut set = Self::new();
        for binding in iter {
            set.insert(binding);
        }
        set
    }
}

impl<'a> IntoIterator for &'a BindingSet {
    type Item = &'a Binding;
    type IntoIter = std::slice::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

/// On-disk shape of a single binding.
#[derive(Serialize, Deserialize)]
struct Record<P> {
    landmarks: P,
    bound_key: String,
}

impl Serialize for BindingSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for binding in self {
            map.serialize_entry(
                binding.label(),
                &Record {
                    landmarks: binding.pose(),
                    bound_key: binding.key().to_string(),
                },
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for BindingSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SetVisitor;

        impl<'de> Visitor<'de> for SetVisitor {
            type Value = BindingSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of gesture labels to bindings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<BindingSet, A::Error> {
                let mut set = BindingSet::new();
                while let Some((label, record)) =
                    access.next_entry::<String, Record<NormalizedPose>>()?
                {
                    let binding = Binding::new(label, record.landmarks, record.bound_key)
                        .map_err(de::Error::custom)?;
                    set.insert(binding);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(SetVisitor)
    }
}
