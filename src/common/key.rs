use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque partition key grouping rows of one data table into tablets.
///
/// Sources pick whatever identifies a stream of rows (a pid, a connection id, ...);
/// the table only hashes and compares it. The empty id is the default tablet for
/// sources that do not partition their output.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TabletId(String);

impl TabletId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TabletId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TabletId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TabletId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
