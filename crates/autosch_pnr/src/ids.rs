//! Opaque ID newtypes for schematic entities.
//!
//! [`InstanceId`] and [`NetId`] are thin `u32` wrappers used as indices into
//! the [`Schematic`](crate::model::Schematic). They are `Copy`, `Ord`, `Hash`,
//! and `Serialize`/`Deserialize`; the ordering makes them usable as
//! `petgraph::graphmap` node weights.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the ID as a `usize` vector index.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a component instance.
    InstanceId
);

define_id!(
    /// Opaque, copyable ID for a net.
    NetId
);
