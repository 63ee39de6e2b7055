use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use super::{PostStore, ProfileStore, SubscriptionStore};
use crate::config::DatabaseConfig;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    NewPost, Post, PostUpdate, Subscription, SubscriptionRemoval, UserProfile, ZipCode,
};

const POST_COLUMNS: &str =
    "id, subject, body, link, posted_at, author_id, author_display_name, zip, edited";

/// PostgreSQL-backed document store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    user_id: Uuid,
    zips: Vec<String>,
    version: i64,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        let zips = row
            .zips
            .into_iter()
            .filter_map(|raw| match ZipCode::parse(&raw) {
                Ok(zip) => Some(zip),
                Err(_) => {
                    warn!(user_id = %row.user_id, zip = %raw, "skipping malformed stored zip");
                    None
                }
            })
            .collect();
        Subscription {
            user_id: row.user_id,
            zips,
            version: row.version,
        }
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Seed or replace a user profile.
    pub async fn upsert_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, display_name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name
            "#,
        )
        .bind(profile.id)
        .bind(&profile.display_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Tells a missing post apart from one owned by somebody else.
    async fn refusal_reason(&self, post_id: Uuid, user_id: Uuid) -> StoreError {
        let owner = sqlx::query_scalar::<_, Uuid>("SELECT author_id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await;
        match owner {
            Ok(Some(_)) => StoreError::NotAuthor { post_id, user_id },
            Ok(None) => StoreError::PostNotFound(post_id),
            Err(e) => StoreError::Database(e),
        }
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let sql = format!(
            r#"
            INSERT INTO posts (id, subject, body, link, posted_at, author_id, author_display_name, zip, edited)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE)
            RETURNING {POST_COLUMNS}
            "#
        );
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(Uuid::new_v4())
            .bind(&post.subject)
            .bind(&post.body)
            .bind(&post.link)
            .bind(post.timestamp)
            .bind(post.author_id)
            .bind(&post.author_display_name)
            .bind(&post.zip)
            .fetch_one(&self.pool)
            .await?;
        Ok(post)
    }

    async fn posts_by_zip(&self, zip: &ZipCode) -> StoreResult<Vec<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE zip = $1 ORDER BY posted_at, id");
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(zip)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn replace_post(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        update: PostUpdate,
    ) -> StoreResult<Post> {
        let sql = format!(
            r#"
            UPDATE posts
            SET subject = $1, body = $2, link = $3, posted_at = $4, edited = TRUE
            WHERE id = $5 AND author_id = $6
            RETURNING {POST_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Post>(&sql)
            .bind(&update.subject)
            .bind(&update.body)
            .bind(&update.link)
            .bind(update.timestamp)
            .bind(post_id)
            .bind(author_id)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(post) => Ok(post),
            None => Err(self.refusal_reason(post_id, author_id).await),
        }
    }

    async fn delete_post(&self, post_id: Uuid, author_id: Uuid) -> StoreResult<()> {
        let affected = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(post_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected > 0 {
            Ok(())
        } else {
            Err(self.refusal_reason(post_id, author_id).await)
        }
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<UserProfile>> {
        let profile =
            sqlx::query_as::<_, UserProfile>("SELECT id, display_name FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(profile)
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn get_subscription(&self, user_id: Uuid) -> StoreResult<Option<Subscription>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT user_id, zips, version FROM subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Subscription::from))
    }

    async fn add_zip(&self, user_id: Uuid, zip: &ZipCode) -> StoreResult<Subscription> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions (user_id, zips, version)
            VALUES ($1, ARRAY[$2]::text[], nextval('subscription_versions'))
            ON CONFLICT (user_id) DO UPDATE
            SET zips = CASE
                    WHEN $2 = ANY(subscriptions.zips) THEN subscriptions.zips
                    ELSE array_append(subscriptions.zips, $2)
                END,
                version = nextval('subscription_versions')
            RETURNING user_id, zips, version
            "#,
        )
        .bind(user_id)
        .bind(zip)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn remove_zip(&self, user_id: Uuid, zip: &ZipCode) -> StoreResult<SubscriptionRemoval> {
        let mut tx = self.pool.begin().await?;

        // The UPDATE holds the row lock until commit, so the emptiness check
        // below sees no interleaved writes.
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            UPDATE subscriptions
            SET zips = array_remove(zips, $2), version = nextval('subscription_versions')
            WHERE user_id = $1
            RETURNING user_id, zips, version
            "#,
        )
        .bind(user_id)
        .bind(zip)
        .fetch_optional(&mut *tx)
        .await?;

        let removal = match row {
            None => {
                let version = sqlx::query_scalar::<_, i64>("SELECT nextval('subscription_versions')")
                    .fetch_one(&mut *tx)
                    .await?;
                SubscriptionRemoval {
                    user_id,
                    remaining: None,
                    version,
                }
            }
            Some(row) if row.zips.is_empty() => {
                sqlx::query("DELETE FROM subscriptions WHERE user_id = $1")
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                SubscriptionRemoval {
                    user_id,
                    remaining: None,
                    version: row.version,
                }
            }
            Some(row) => {
                let version = row.version;
                SubscriptionRemoval {
                    user_id,
                    remaining: Some(Subscription::from(row)),
                    version,
                }
            }
        };

        tx.commit().await?;
        Ok(removal)
    }
}
