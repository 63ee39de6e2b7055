//! Ephemeral feed view state.
//!
//! Nothing here is persisted: form visibility, the draft being edited, sort
//! order and reaction toggles all reset when the feed is reloaded.

use std::collections::HashMap;
use uuid::Uuid;

use crate::error::FeedResult;
use crate::models::{Post, PostDraft};
use crate::services::SortOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    Up,
    Down,
}

/// Local thumbs up/down toggles for one post. Decorative, not a tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Reactions {
    pub up: bool,
    pub down: bool,
}

/// What submitting the form should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(PostDraft),
    Update { post_id: Uuid, draft: PostDraft },
}

#[derive(Debug, Default)]
pub struct FeedViewState {
    form_open: bool,
    draft: PostDraft,
    edit_target: Option<Uuid>,
    sort_order: SortOrder,
    reactions: HashMap<Uuid, Reactions>,
}

impl FeedViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_form_open(&self) -> bool {
        self.form_open
    }

    pub fn draft(&self) -> &PostDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut PostDraft {
        &mut self.draft
    }

    pub fn edit_target(&self) -> Option<Uuid> {
        self.edit_target
    }

    /// Open or close the form. Closing discards the draft and edit target.
    pub fn toggle_form(&mut self) {
        if self.form_open {
            self.close_form();
        } else {
            self.form_open = true;
        }
    }

    /// Open the form pre-filled from `post`.
    pub fn begin_edit(&mut self, post: &Post) {
        self.draft = PostDraft::from_post(post);
        self.edit_target = Some(post.id);
        self.form_open = true;
    }

    /// Validate the draft and decide between create and update.
    pub fn submission(&self) -> FeedResult<Submission> {
        let draft = self.draft.clone().validated()?;
        Ok(match self.edit_target {
            Some(post_id) => Submission::Update { post_id, draft },
            None => Submission::Create(draft),
        })
    }

    /// Call once the controller has accepted the submission.
    pub fn submitted(&mut self) {
        self.close_form();
    }

    pub fn reaction(&self, post_id: Uuid) -> Reactions {
        self.reactions.get(&post_id).copied().unwrap_or_default()
    }

    /// Flip one toggle for one post and return the new state.
    pub fn toggle_reaction(&mut self, post_id: Uuid, kind: ReactionKind) -> Reactions {
        let entry = self.reactions.entry(post_id).or_default();
        match kind {
            ReactionKind::Up => entry.up = !entry.up,
            ReactionKind::Down => entry.down = !entry.down,
        }
        *entry
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.sort_order = order;
    }

    /// Back to defaults, as on a page reload.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn close_form(&mut self) {
        self.form_open = false;
        self.draft = PostDraft::default();
        self.edit_target = None;
    }
}
