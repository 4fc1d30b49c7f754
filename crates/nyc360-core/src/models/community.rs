use serde::{Deserialize, Serialize};

use super::Identified;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub member_count: i64,
    #[serde(default)]
    pub is_joined: bool,
    /// Set while a join/leave call is in flight; disables the control.
    #[serde(skip)]
    pub is_loading_join: bool,
}

impl Community {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

impl Identified for Community {
    fn id(&self) -> i64 {
        self.id
    }
}
