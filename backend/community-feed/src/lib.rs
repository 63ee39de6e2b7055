/// Community Feed Library
///
/// Zip-scoped community posts and per-user zip subscriptions, kept consistent
/// with a remote document store. Local state is only changed after the store
/// acknowledges a write, and responses for a feed the user already left are
/// dropped.
///
/// # Modules
///
/// - `models`: Posts, drafts, subscriptions, identities and zip codes
/// - `store`: Document store traits with in-memory and PostgreSQL backends
/// - `services`: Feed controller, subscription manager, zip entry, sign-in gate
/// - `view`: Ephemeral view state (form, sort order, reactions)
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `telemetry`: Tracing setup
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod view;

pub use config::Config;
pub use error::{FeedError, FeedResult, StoreError, StoreResult};
pub use services::{PostFeedController, SortOrder, SubscriptionManager};
pub use store::{connect_store, FeedStore};
pub use view::FeedViewState;
