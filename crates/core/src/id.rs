// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes.
//!
//! Every id in tabfleet is handed to us by someone else: job ids by the
//! server, resource handles by the host, agent ids by the store or the UI.
//! The wrappers only exist so the three can't be mixed up.

/// Define a string id newtype backed by `SmolStr`.
///
/// Generates `new()`, `as_str()`, `is_empty()`, `Display`,
/// `From<&str>`, `From<String>`, `PartialEq<str>`, `Borrow<str>` and
/// `Deref<Target = str>`. Serializes transparently as a JSON string.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct JobId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub smol_str::SmolStr);

        impl $name {
            pub fn new(id: impl Into<smol_str::SmolStr>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }
    };
}

crate::define_id! {
    /// Server-assigned job identifier.
    pub struct JobId;
}

crate::define_id! {
    /// Identity this agent registers under.
    ///
    /// Either a bare 4-character suffix (`k3x9`) or `{alias}_{suffix}`.
    pub struct AgentId;
}

crate::define_id! {
    /// Opaque handle of a pooled resource, as issued by the host.
    pub struct ResourceId;
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
