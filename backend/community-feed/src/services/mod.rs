//! Business logic layer
//!
//! - `posts`: zip-scoped post list, ownership-gated mutations, two-phase delete
//! - `subscriptions`: per-user zip subscriptions
//! - `zip_entry`: typed/located zip input and feed navigation
//! - `identity`: sign-in gate over the external identity provider

pub mod identity;
pub mod posts;
pub mod subscriptions;
pub mod zip_entry;

pub use identity::{feed_route, require_identity, IdentityProvider, StaticIdentity};
pub use posts::{sort_posts, Affordances, DeleteConfirmation, PostFeedController, SortOrder};
pub use subscriptions::SubscriptionManager;
pub use zip_entry::{Route, ZipEntry, ZipLocator};
