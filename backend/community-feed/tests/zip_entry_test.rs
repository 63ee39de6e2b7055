/// Zip entry form and the sign-in gate in front of feeds
use async_trait::async_trait;
use community_feed::models::{Identity, ZipCode};
use community_feed::services::{
    feed_route, require_identity, Route, StaticIdentity, ZipEntry, ZipLocator,
};
use community_feed::FeedError;
use std::sync::Arc;
use uuid::Uuid;

struct FixedLocator(Option<&'static str>);

#[async_trait]
impl ZipLocator for FixedLocator {
    async fn locate(&self) -> Option<String> {
        self.0.map(str::to_string)
    }
}

/// Records whether the entry reported a lookup in flight while locating.
struct ObservingLocator {
    entry: Arc<ZipEntry>,
    seen_locating: parking_lot::Mutex<bool>,
}

#[async_trait]
impl ZipLocator for ObservingLocator {
    async fn locate(&self) -> Option<String> {
        *self.seen_locating.lock() = self.entry.is_locating();
        tokio::task::yield_now().await;
        Some("60601".to_string())
    }
}

#[test]
fn test_short_zip_shows_error_and_does_not_navigate() {
    let entry = ZipEntry::new();

    let err = entry.submit("1234").unwrap_err();
    assert!(matches!(err, FeedError::Validation(_)));
    assert_eq!(
        entry.error().as_deref(),
        Some("Please enter a valid 5-digit ZIP code.")
    );
}

#[test]
fn test_valid_zip_navigates_to_its_feed() {
    let entry = ZipEntry::new();

    let route = entry.submit("90210").unwrap();
    assert_eq!(route.path(), "/news/90210");
    assert!(entry.error().is_none());

    assert!(entry.submit(" 10001").is_err());
    assert_eq!(
        entry.error().as_deref(),
        Some("Please enter a valid 5-digit ZIP code.")
    );
    assert!(entry.submit("9021O").is_err());
    assert!(entry.submit("902100").is_err());
}

#[tokio::test]
async fn test_location_lookup_navigates() {
    let entry = ZipEntry::new();

    let route = entry
        .use_current_location(&FixedLocator(Some("94103")))
        .await
        .unwrap();
    assert_eq!(route, Route::Feed(ZipCode::parse("94103").unwrap()));
    assert!(!entry.is_locating());
    assert!(entry.error().is_none());
}

#[tokio::test]
async fn test_failed_location_lookup_shows_error() {
    let entry = ZipEntry::new();

    let err = entry
        .use_current_location(&FixedLocator(None))
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::LocationUnavailable));
    assert_eq!(
        entry.error().as_deref(),
        Some("Unable to fetch your ZIP code from location.")
    );
    assert!(!entry.is_locating());
}

#[test]
fn test_non_us_postcode_from_location_is_rejected() {
    let entry = ZipEntry::new();

    let err = tokio_test::block_on(entry.use_current_location(&FixedLocator(Some("SW1A 1AA"))))
        .unwrap_err();
    assert!(matches!(err, FeedError::LocationUnavailable));
    assert!(entry.error().is_some());
}

#[tokio::test]
async fn test_entry_reports_locating_during_lookup() {
    let entry = Arc::new(ZipEntry::new());
    let locator = ObservingLocator {
        entry: entry.clone(),
        seen_locating: parking_lot::Mutex::new(false),
    };

    let route = entry.use_current_location(&locator).await.unwrap();
    assert_eq!(route.path(), "/news/60601");
    assert!(*locator.seen_locating.lock());
    assert!(!entry.is_locating());
}

#[test]
fn test_signed_out_visitor_is_sent_to_sign_in() {
    let zip = ZipCode::parse("90210").unwrap();

    let signed_out = StaticIdentity::signed_out();
    assert_eq!(feed_route(&signed_out, zip.clone()), Route::SignIn);
    assert!(matches!(
        require_identity(&signed_out),
        Err(FeedError::NotAuthenticated)
    ));

    let ana = Identity::new(Uuid::new_v4()).with_display_name("Ana");
    let signed_in = StaticIdentity::signed_in(ana.clone());
    assert_eq!(feed_route(&signed_in, zip.clone()), Route::Feed(zip));
    assert_eq!(require_identity(&signed_in).unwrap(), ana);
}
