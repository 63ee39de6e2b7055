//! Data models for the community feed
//!
//! - `Post`: a zip-scoped community post, plus its draft/insert/update forms
//! - `Subscription`: the set of zips a user follows, and removal results
//! - `UserProfile` / `Identity`: author data and the signed-in user
//! - `ZipCode`: validated five-digit zip

mod post;
mod subscription;
mod user;
mod zip;

pub use post::{NewPost, Post, PostDraft, PostUpdate};
pub use subscription::{Subscription, SubscriptionRemoval};
pub use user::{Identity, UserProfile};
pub use zip::ZipCode;
