//! Per-kind event allow-lists.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wildcard entry accepted in allow-lists.
pub const ALL: &str = "all";

/// Which event kinds a consumer wants.
///
/// Deserializes from either the string `"all"` or a list of kinds, where a
/// list containing `"all"` also means everything. Kinds match exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EventFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl EventFilter {
    pub fn from_kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for kind in kinds {
            let kind = kind.into();
            if kind == ALL {
                return Self::All;
            }
            set.insert(kind);
        }
        Self::Only(set)
    }

    pub fn allows(&self, kind: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(kinds) => kinds.contains(kind),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFilter {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for EventFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawFilter::deserialize(deserializer)? {
            RawFilter::One(kind) => Self::from_kinds([kind]),
            RawFilter::Many(kinds) => Self::from_kinds(kinds),
        })
    }
}

impl Serialize for EventFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str(ALL),
            Self::Only(kinds) => kinds.serialize(serializer),
        }
    }
}
