/// Zip code entry - turns typed or located zip codes into feed navigation
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::{FeedError, FeedResult};
use crate::models::ZipCode;

/// Navigation targets the core asks the routing layer for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Feed(ZipCode),
    SignIn,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Feed(zip) => format!("/news/{zip}"),
            Route::SignIn => "/signin".to_string(),
        }
    }
}

/// Resolves the device location to a postcode. `None` covers every failure.
#[async_trait]
pub trait ZipLocator: Send + Sync {
    async fn locate(&self) -> Option<String>;
}

#[derive(Debug, Default)]
struct EntryState {
    error: Option<String>,
    locating: bool,
}

/// State of the zip entry form.
#[derive(Debug, Default)]
pub struct ZipEntry {
    state: Mutex<EntryState>,
}

impl ZipEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inline error currently shown under the form.
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// True while a location lookup is in flight.
    pub fn is_locating(&self) -> bool {
        self.state.lock().locating
    }

    /// Validate typed input and navigate to its feed.
    pub fn submit(&self, input: &str) -> FeedResult<Route> {
        let mut state = self.state.lock();
        match ZipCode::parse(input) {
            Ok(zip) => {
                state.error = None;
                Ok(Route::Feed(zip))
            }
            Err(err) => {
                state.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Look up the device's zip and navigate to its feed.
    pub async fn use_current_location(&self, locator: &dyn ZipLocator) -> FeedResult<Route> {
        {
            let mut state = self.state.lock();
            state.locating = true;
            state.error = None;
        }

        let located = locator.locate().await;

        let mut state = self.state.lock();
        state.locating = false;
        match located.as_deref().map(ZipCode::parse) {
            Some(Ok(zip)) => {
                info!(%zip, "resolved zip from device location");
                Ok(Route::Feed(zip))
            }
            Some(Err(_)) | None => {
                warn!(located = ?located, "could not resolve a zip from device location");
                let err = FeedError::LocationUnavailable;
                state.error = Some(err.user_message());
                Err(err)
            }
        }
    }
}
