use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::ZipCode;
use crate::error::{FeedError, FeedResult};

/// A community post scoped to one zip code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub subject: String,
    pub body: String,
    pub link: Option<String>,
    #[sqlx(rename = "posted_at")]
    pub timestamp: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_display_name: String,
    pub zip: ZipCode,
    /// Set by the first successful update; never cleared.
    pub edited: bool,
}

impl Post {
    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }
}

/// A post that has not been persisted yet; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub subject: String,
    pub body: String,
    pub link: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_display_name: String,
    pub zip: ZipCode,
}

impl NewPost {
    pub fn into_post(self, id: Uuid) -> Post {
        Post {
            id,
            subject: self.subject,
            body: self.body,
            link: self.link,
            timestamp: self.timestamp,
            author_id: self.author_id,
            author_display_name: self.author_display_name,
            zip: self.zip,
            edited: false,
        }
    }
}

/// Full replacement of the user-editable fields of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    pub subject: String,
    pub body: String,
    pub link: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PostUpdate {
    /// Applies the update, marking the post as edited.
    pub fn apply_to(&self, post: &mut Post) {
        post.subject = self.subject.clone();
        post.body = self.body.clone();
        post.link = self.link.clone();
        post.timestamp = self.timestamp;
        post.edited = true;
    }
}

/// Form contents for creating or editing a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PostDraft {
    #[validate(length(min = 1, message = "Please enter a subject."))]
    pub subject: String,
    #[validate(length(min = 1, message = "Please enter some text for your post."))]
    pub body: String,
    #[validate(url(message = "Please enter a valid link."))]
    pub link: Option<String>,
}

impl PostDraft {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Seeds a draft from an existing post for editing.
    pub fn from_post(post: &Post) -> Self {
        Self {
            subject: post.subject.clone(),
            body: post.body.clone(),
            link: post.link.clone(),
        }
    }

    /// Trims the draft and checks required fields before any remote call.
    pub fn validated(self) -> FeedResult<Self> {
        let link = self
            .link
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        let draft = Self {
            subject: self.subject.trim().to_string(),
            body: self.body.trim().to_string(),
            link,
        };

        if let Err(errors) = draft.validate() {
            let field_errors = errors.field_errors();
            let message = ["subject", "body", "link"]
                .iter()
                .filter_map(|field| field_errors.get(*field))
                .filter_map(|errs| errs.first())
                .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "Please fill in the required fields.".to_string());
            return Err(FeedError::Validation(message));
        }

        Ok(draft)
    }
}
