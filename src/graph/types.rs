//! Identifier and name types for the in-memory graph

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a node in the graph's node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Position of an edge in the graph's edge arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

impl NodeId {
    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                $name(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

name_type!(
    /// Node label, e.g. `NICEWorkrole`
    Label
);

name_type!(
    /// Relationship type, e.g. `NICE_WORKROLE`
    EdgeType
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(NodeId(3).to_string(), "NodeId(3)");
        assert_eq!(EdgeId(9).to_string(), "EdgeId(9)");
        assert_eq!(Label::new("KSAT").to_string(), "KSAT");
        assert_eq!(EdgeType::from("NICE_WORKROLE").as_str(), "NICE_WORKROLE");
    }

    #[test]
    fn test_label_ordering() {
        let mut labels = vec![Label::from("Task"), Label::from("KSAT")];
        labels.sort();
        assert_eq!(labels[0].as_str(), "KSAT");
    }
}
