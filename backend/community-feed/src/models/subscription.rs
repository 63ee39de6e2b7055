use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::ZipCode;

/// A user's subscribed zip codes. A stored record never has an empty set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub user_id: Uuid,
    pub zips: BTreeSet<ZipCode>,
    /// Bumped by the store on every write.
    pub version: i64,
}

impl Subscription {
    pub fn contains(&self, zip: &ZipCode) -> bool {
        self.zips.contains(zip)
    }

    /// Zips in display order.
    pub fn to_list(&self) -> Vec<ZipCode> {
        self.zips.iter().cloned().collect()
    }
}

/// Result of removing one zip from a user's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRemoval {
    pub user_id: Uuid,
    /// `None` once the last zip is gone and the record was deleted.
    pub remaining: Option<Subscription>,
    /// Version the store assigned to this write, also when nothing remains.
    pub version: i64,
}
