use tracing::debug;

use super::zip_entry::Route;
use crate::error::{FeedError, FeedResult};
use crate::models::{Identity, ZipCode};

/// Source of the signed-in user. Authentication itself happens elsewhere.
pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Option<Identity>;
}

/// A provider that always reports the same session.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<Identity>);

impl StaticIdentity {
    pub fn signed_in(identity: Identity) -> Self {
        Self(Some(identity))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// Snapshot the current identity, or `NotAuthenticated`.
pub fn require_identity(provider: &dyn IdentityProvider) -> FeedResult<Identity> {
    provider.current().ok_or(FeedError::NotAuthenticated)
}

/// Where entering a zip feed should land: the feed, or the sign-in page.
pub fn feed_route(provider: &dyn IdentityProvider, zip: ZipCode) -> Route {
    match provider.current() {
        Some(_) => Route::Feed(zip),
        None => {
            debug!(%zip, "no identity; routing to sign-in");
            Route::SignIn
        }
    }
}
