//! Identity types for the RONDO substrate
//!
//! All registries are caller-named: identifiers wrap the string the
//! registering collaborator chose. Uniqueness is enforced per registry,
//! never globally.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident, $tag:literal) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                $name(id)
            }
        }
    };
}

string_id!(
    /// Worker core identity - unique within a shell's core registry
    CoreId,
    "Core"
);

string_id!(
    /// Channel identity - unique within a shell's channel registry
    ChannelId,
    "Channel"
);

string_id!(
    /// Pipe identity - unique within a shell's pipe registry
    PipeId,
    "Pipe"
);

string_id!(
    /// Scheduled task identity - unique within the orchestra's scheduler
    TaskId,
    "Task"
);

string_id!(
    /// Event loop identity - unique within the orchestra's loop registry
    LoopId,
    "Loop"
);

string_id!(
    /// Protocol identity - unique within the orchestra's protocol registry
    ProtocolId,
    "Protocol"
);

string_id!(
    /// Process graph edge identity - unique within a gestalt's graph
    EdgeId,
    "Edge"
);
