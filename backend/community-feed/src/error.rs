//! Error types for the community feed core.
//!
//! `StoreError` describes what went wrong at the remote document store;
//! `FeedError` is what callers of the controllers see.

use thiserror::Error;
use uuid::Uuid;

use crate::models::ZipCode;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Inline message shown when a zip code does not have exactly five digits.
pub const INVALID_ZIP_MESSAGE: &str = "Please enter a valid 5-digit ZIP code.";

/// Errors raised by a document store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Post not found: {0}")]
    PostNotFound(Uuid),

    /// The store refused a mutation because the acting user is not the author.
    #[error("User {user_id} is not the author of post {post_id}")]
    NotAuthor { post_id: Uuid, user_id: Uuid },
}

/// Errors surfaced to the view layer.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Please sign in to view this feed")]
    NotAuthenticated,

    #[error("{0}")]
    Validation(String),

    #[error("Failed to load from store: {0}")]
    RemoteRead(#[source] StoreError),

    #[error("Failed to save to store: {0}")]
    RemoteWrite(#[source] StoreError),

    #[error("User {user_id} may not modify post {post_id}")]
    OwnershipViolation { post_id: Uuid, user_id: Uuid },

    #[error("Profile not found for user {0}")]
    ProfileNotFound(Uuid),

    #[error("Post not found: {0}")]
    PostNotFound(Uuid),

    #[error("No delete is awaiting confirmation")]
    NoPendingDelete,

    #[error("A delete is already in progress")]
    DeleteInProgress,

    #[error("Unable to fetch your ZIP code from location.")]
    LocationUnavailable,

    /// A response arrived for a zip that is no longer being viewed.
    #[error("Discarded stale response for zip {zip}")]
    Stale { zip: ZipCode },
}

impl FeedError {
    /// Maps a failed store write, keeping ownership refusals distinguishable.
    pub(crate) fn from_write(err: StoreError) -> Self {
        match err {
            StoreError::NotAuthor { post_id, user_id } => {
                FeedError::OwnershipViolation { post_id, user_id }
            }
            StoreError::PostNotFound(id) => FeedError::PostNotFound(id),
            other => FeedError::RemoteWrite(other),
        }
    }

    /// Message suitable for showing next to the action that failed.
    pub fn user_message(&self) -> String {
        match self {
            FeedError::Validation(msg) => msg.clone(),
            FeedError::NotAuthenticated => "Please sign in to continue.".to_string(),
            FeedError::RemoteRead(_) => "Could not load posts. Please try again.".to_string(),
            FeedError::RemoteWrite(_) => "Could not save your change. Please try again.".to_string(),
            FeedError::OwnershipViolation { .. } => {
                "You can only change your own posts.".to_string()
            }
            FeedError::ProfileNotFound(_) => {
                "Your profile could not be found. Please try again.".to_string()
            }
            FeedError::PostNotFound(_) => "That post no longer exists.".to_string(),
            FeedError::NoPendingDelete => "Nothing to delete.".to_string(),
            FeedError::DeleteInProgress => "Still deleting the previous post.".to_string(),
            FeedError::LocationUnavailable => self.to_string(),
            FeedError::Stale { .. } => String::new(),
        }
    }
}
