/// Post feed controller - owns the post list of the zip being viewed
///
/// Local state changes only after the store acknowledges a write. Loads are
/// tagged with a generation so a slow response for a zip the user already
/// left cannot overwrite the current list.
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{FeedError, FeedResult};
use crate::models::{Identity, NewPost, Post, PostDraft, PostUpdate, ZipCode};
use crate::store::{FeedStore, PostStore, ProfileStore};
use crate::view::Submission;

/// Timestamp ordering for the rendered feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    /// Newest first
    #[default]
    Descending,
}

/// Two-phase delete state.
///
/// `Idle → PendingConfirm(id)` on request, back to `Idle` on cancel,
/// `PendingConfirm(id) → Deleting(id)` on confirm, then `Idle` once the store
/// acknowledges, or `PendingConfirm(id)` again if it refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteConfirmation {
    #[default]
    Idle,
    PendingConfirm(Uuid),
    Deleting(Uuid),
}

impl DeleteConfirmation {
    pub fn is_dialog_open(&self) -> bool {
        !matches!(self, DeleteConfirmation::Idle)
    }
}

/// Which mutation controls the view may show for a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Affordances {
    pub can_edit: bool,
    pub can_delete: bool,
}

/// A write the store acknowledged while a load of the same zip was in flight.
enum AckedWrite {
    Upsert(Post),
    Removed(Uuid),
}

#[derive(Default)]
struct FeedState {
    zip: Option<ZipCode>,
    /// Incremented on every navigation; completions carry the value they started with.
    generation: u64,
    posts: Vec<Post>,
    delete: DeleteConfirmation,
    notice: Option<String>,
    loading: bool,
    /// Replayed onto the snapshot when the current load completes, since the
    /// snapshot may have been read before these writes landed.
    acked_during_load: Vec<AckedWrite>,
}

impl FeedState {
    fn upsert(&mut self, post: Post) {
        match self.posts.iter_mut().find(|p| p.id == post.id) {
            Some(slot) => *slot = post,
            None => self.posts.push(post),
        }
    }

    /// Apply an acknowledged write for a post in the zip being shown.
    fn record(&mut self, write: AckedWrite) {
        match &write {
            AckedWrite::Upsert(post) => self.upsert(post.clone()),
            AckedWrite::Removed(id) => self.posts.retain(|p| p.id != *id),
        }
        if self.loading {
            self.acked_during_load.push(write);
        }
    }

    fn replay_acked(&mut self) {
        for write in std::mem::take(&mut self.acked_during_load) {
            match write {
                AckedWrite::Upsert(post) => self.upsert(post),
                AckedWrite::Removed(id) => self.posts.retain(|p| p.id != id),
            }
        }
    }
}

pub struct PostFeedController {
    posts: Arc<dyn PostStore>,
    profiles: Arc<dyn ProfileStore>,
    identity: Identity,
    state: Mutex<FeedState>,
}

impl PostFeedController {
    pub fn new(posts: Arc<dyn PostStore>, profiles: Arc<dyn ProfileStore>, identity: Identity) -> Self {
        Self {
            posts,
            profiles,
            identity,
            state: Mutex::new(FeedState::default()),
        }
    }

    pub fn from_store(store: &FeedStore, identity: Identity) -> Self {
        Self::new(store.posts.clone(), store.profiles.clone(), identity)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn active_zip(&self) -> Option<ZipCode> {
        self.state.lock().zip.clone()
    }

    /// Snapshot of the canonical (store-ordered) list.
    pub fn posts(&self) -> Vec<Post> {
        self.state.lock().posts.clone()
    }

    pub fn post(&self, post_id: Uuid) -> Option<Post> {
        self.state.lock().posts.iter().find(|p| p.id == post_id).cloned()
    }

    pub fn delete_state(&self) -> DeleteConfirmation {
        self.state.lock().delete
    }

    /// Last failure message for the user, cleared on read.
    pub fn take_notice(&self) -> Option<String> {
        self.state.lock().notice.take()
    }

    pub fn affordances(&self, post: &Post) -> Affordances {
        let owns = post.is_authored_by(self.identity.user_id);
        Affordances {
            can_edit: owns,
            can_delete: owns,
        }
    }

    /// Navigate to `zip` and replace the local list with its posts.
    ///
    /// On a store failure the list is left empty. Returns `FeedError::Stale`
    /// if another navigation started while this load was in flight.
    pub async fn load(&self, zip: ZipCode) -> FeedResult<usize> {
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.zip = Some(zip.clone());
            state.posts.clear();
            state.delete = DeleteConfirmation::Idle;
            state.loading = true;
            state.acked_during_load.clear();
            state.generation
        };

        let result = self.posts.posts_by_zip(&zip).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(%zip, "discarding stale feed load");
            return Err(FeedError::Stale { zip });
        }
        state.loading = false;

        match result {
            Ok(posts) => {
                state.posts = posts;
                state.replay_acked();
                let count = state.posts.len();
                info!(%zip, count, "feed loaded");
                Ok(count)
            }
            Err(e) => {
                error!(%zip, error = %e, "failed to load feed");
                state.acked_during_load.clear();
                state.posts.clear();
                let err = FeedError::RemoteRead(e);
                state.notice = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Create a post in the active zip, authored by the injected identity.
    pub async fn create(&self, draft: PostDraft) -> FeedResult<Post> {
        let draft = draft.validated()?;
        let zip = self.active_zip().ok_or_else(|| {
            FeedError::Validation("Open a ZIP code feed before posting.".to_string())
        })?;
        let author_id = self.identity.user_id;

        let profile = match self.profiles.get_profile(author_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!(%author_id, "author profile missing; post not created");
                return Err(self.surface(FeedError::ProfileNotFound(author_id)));
            }
            Err(e) => {
                error!(%author_id, error = %e, "failed to resolve author profile");
                return Err(self.surface(FeedError::RemoteRead(e)));
            }
        };

        let new_post = NewPost {
            subject: draft.subject,
            body: draft.body,
            link: draft.link,
            timestamp: Utc::now(),
            author_id,
            author_display_name: profile.display_name,
            zip: zip.clone(),
        };

        let saved = match self.posts.insert_post(new_post).await {
            Ok(post) => post,
            Err(e) => {
                error!(%zip, %author_id, error = %e, "failed to create post");
                return Err(self.surface(FeedError::from_write(e)));
            }
        };

        let mut state = self.state.lock();
        if state.zip.as_ref() == Some(&saved.zip) {
            state.record(AckedWrite::Upsert(saved.clone()));
        } else {
            debug!(post_id = %saved.id, zip = %saved.zip, "created post belongs to a feed no longer shown");
        }
        info!(post_id = %saved.id, zip = %saved.zip, "post created");
        Ok(saved)
    }

    /// Replace subject/body/link of a post the injected identity authored.
    pub async fn update(&self, post_id: Uuid, draft: PostDraft) -> FeedResult<Post> {
        let draft = draft.validated()?;
        let user_id = self.identity.user_id;

        let existing = self.post(post_id).ok_or(FeedError::PostNotFound(post_id))?;
        if !existing.is_authored_by(user_id) {
            warn!(%post_id, %user_id, "edit refused: not the author");
            return Err(self.surface(FeedError::OwnershipViolation { post_id, user_id }));
        }

        // The refreshed timestamp must move forward even on coarse clocks.
        let timestamp = Utc::now().max(existing.timestamp + Duration::microseconds(1));
        let update = PostUpdate {
            subject: draft.subject,
            body: draft.body,
            link: draft.link,
            timestamp,
        };

        let saved = match self.posts.replace_post(post_id, user_id, update).await {
            Ok(post) => post,
            Err(e) => {
                error!(%post_id, error = %e, "failed to update post");
                return Err(self.surface(FeedError::from_write(e)));
            }
        };

        {
            let mut state = self.state.lock();
            let listed = state.posts.iter().any(|p| p.id == post_id);
            if listed || (state.loading && state.zip.as_ref() == Some(&saved.zip)) {
                state.record(AckedWrite::Upsert(saved.clone()));
            }
        }
        info!(%post_id, "post updated");
        Ok(saved)
    }

    /// Route a form submission to `create` or `update`.
    pub async fn submit(&self, submission: Submission) -> FeedResult<Post> {
        match submission {
            Submission::Create(draft) => self.create(draft).await,
            Submission::Update { post_id, draft } => self.update(post_id, draft).await,
        }
    }

    /// First phase of delete: open the confirmation for `post_id`.
    pub fn request_delete(&self, post_id: Uuid) -> FeedResult<()> {
        let user_id = self.identity.user_id;
        let mut state = self.state.lock();

        if let DeleteConfirmation::Deleting(_) = state.delete {
            return Err(FeedError::DeleteInProgress);
        }
        let post = state
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .ok_or(FeedError::PostNotFound(post_id))?;
        if !post.is_authored_by(user_id) {
            warn!(%post_id, %user_id, "delete refused: not the author");
            let err = FeedError::OwnershipViolation { post_id, user_id };
            state.notice = Some(err.user_message());
            return Err(err);
        }

        state.delete = DeleteConfirmation::PendingConfirm(post_id);
        Ok(())
    }

    /// Close the confirmation without touching the store.
    pub fn cancel_delete(&self) {
        let mut state = self.state.lock();
        if let DeleteConfirmation::PendingConfirm(_) = state.delete {
            state.delete = DeleteConfirmation::Idle;
        }
    }

    /// Second phase of delete: issue the remote delete for the pending post.
    pub async fn confirm_delete(&self) -> FeedResult<()> {
        let post_id = {
            let mut state = self.state.lock();
            match state.delete {
                DeleteConfirmation::PendingConfirm(id) => {
                    state.delete = DeleteConfirmation::Deleting(id);
                    id
                }
                DeleteConfirmation::Deleting(_) => return Err(FeedError::DeleteInProgress),
                DeleteConfirmation::Idle => return Err(FeedError::NoPendingDelete),
            }
        };

        let result = self.posts.delete_post(post_id, self.identity.user_id).await;

        let mut state = self.state.lock();
        let still_current = state.delete == DeleteConfirmation::Deleting(post_id);
        match result {
            Ok(()) => {
                state.record(AckedWrite::Removed(post_id));
                if still_current {
                    state.delete = DeleteConfirmation::Idle;
                }
                info!(%post_id, "post deleted");
                Ok(())
            }
            Err(e) => {
                error!(%post_id, error = %e, "failed to delete post");
                if still_current {
                    state.delete = DeleteConfirmation::PendingConfirm(post_id);
                }
                let err = FeedError::from_write(e);
                state.notice = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// The local list ordered by timestamp; the canonical list is untouched.
    pub fn sorted_view(&self, order: SortOrder) -> Vec<Post> {
        sort_posts(self.posts(), order)
    }

    fn surface(&self, err: FeedError) -> FeedError {
        self.state.lock().notice = Some(err.user_message());
        err
    }
}

/// Stable sort by timestamp. Descending is the exact reverse of ascending,
/// so equal timestamps mirror rather than keep insertion order.
pub fn sort_posts(mut posts: Vec<Post>, order: SortOrder) -> Vec<Post> {
    posts.sort_by_key(|p| p.timestamp);
    if order == SortOrder::Descending {
        posts.reverse();
    }
    posts
}
