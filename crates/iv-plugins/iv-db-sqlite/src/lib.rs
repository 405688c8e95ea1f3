//! # iv-db-sqlite
//!
//! SQLite implementation of the `IdeaRepo` port. Maps between the
//! relational row layout and the `iv-core` domain models: ids are stored
//! as UUID blobs, tags as a JSON array column, mood/status as lowercase
//! text so rows written by other clients degrade to `Unknown` instead of
//! failing a read.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use iv_core::error::{AppError, Result};
use iv_core::models::{Idea, IdeaDraft, IdeaPatch, Mood, Status};
use iv_core::traits::IdeaRepo;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS ideas (
    id         BLOB PRIMARY KEY,
    user_id    TEXT NOT NULL,
    text       TEXT NOT NULL,
    tags       TEXT NOT NULL DEFAULT '[]',
    mood       TEXT NOT NULL DEFAULT 'happy',
    favorite   INTEGER NOT NULL DEFAULT 0,
    status     TEXT NOT NULL DEFAULT 'open',
    image_url  TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

const OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_ideas_owner_created ON ideas (user_id, created_at DESC)";

pub struct SqliteIdeaRepo {
    pool: SqlitePool,
}

// Helpers for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

fn store_err(err: sqlx::Error) -> AppError {
    AppError::StoreUnavailable(err.to_string())
}

fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::Validation("idea text must not be empty".into()));
    }
    Ok(())
}

fn validate_mood(mood: Mood) -> Result<()> {
    if mood == Mood::Unknown {
        return Err(AppError::Validation("unrecognized mood".into()));
    }
    Ok(())
}

fn validate_status(status: Status) -> Result<()> {
    if status == Status::Unknown {
        return Err(AppError::Validation("unrecognized status".into()));
    }
    Ok(())
}

fn row_to_idea(row: &SqliteRow) -> Idea {
    Idea {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        user_id: row.get("user_id"),
        text: row.get("text"),
        tags: serde_json::from_str(&row.get::<String, _>("tags")).unwrap_or_default(),
        mood: Mood::parse(&row.get::<String, _>("mood")),
        favorite: row.get("favorite"),
        status: Status::parse(&row.get::<String, _>("status")),
        image_url: row.get("image_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl SqliteIdeaRepo {
    /// Opens (creating if missing) the database at `url` and bootstraps
    /// the schema.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(store_err)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(store_err)?;
        Self::migrate(pool).await
    }

    /// A private in-memory database, mainly for tests and demos. Pinned
    /// to a single connection: each `:memory:` connection is its own db.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(store_err)?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA).execute(&pool).await.map_err(store_err)?;
        sqlx::query(OWNER_INDEX).execute(&pool).await.map_err(store_err)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl IdeaRepo for SqliteIdeaRepo {
    async fn list(&self, owner: &str) -> Result<Vec<Idea>> {
        let rows = sqlx::query("SELECT * FROM ideas WHERE user_id = ? ORDER BY created_at DESC")
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(rows.iter().map(row_to_idea).collect())
    }

    async fn create(&self, owner: &str, draft: IdeaDraft) -> Result<Idea> {
        validate_text(&draft.text)?;
        validate_mood(draft.mood)?;
        validate_status(draft.status)?;

        let now: DateTime<Utc> = Utc::now();
        let idea = Idea {
            id: Uuid::new_v4(),
            user_id: owner.to_string(),
            text: draft.text,
            tags: draft.tags,
            mood: draft.mood,
            favorite: draft.favorite,
            status: draft.status,
            image_url: draft.image_url,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO ideas (id, user_id, text, tags, mood, favorite, status, image_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(idea.id))
        .bind(&idea.user_id)
        .bind(&idea.text)
        .bind(serde_json::to_string(&idea.tags).unwrap_or_else(|_| "[]".into()))
        .bind(idea.mood.as_str())
        .bind(idea.favorite)
        .bind(idea.status.as_str())
        .bind(&idea.image_url)
        .bind(idea.created_at)
        .bind(idea.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        log::debug!("created idea {} for {}", idea.id, owner);
        Ok(idea)
    }

    /// Fetch-merge-write: unspecified patch fields keep the stored value,
    /// `updated_at` is restamped. `created_at` is never written here.
    async fn update(&self, owner: &str, id: Uuid, patch: IdeaPatch) -> Result<()> {
        if let Some(text) = &patch.text {
            validate_text(text)?;
        }
        if let Some(mood) = patch.mood {
            validate_mood(mood)?;
        }
        if let Some(status) = patch.status {
            validate_status(status)?;
        }

        let row = sqlx::query("SELECT * FROM ideas WHERE id = ? AND user_id = ?")
            .bind(uuid_to_blob(id))
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        let Some(row) = row else {
            return Err(AppError::NotFound("idea".into(), id.to_string()));
        };
        let mut idea = row_to_idea(&row);

        if let Some(text) = patch.text {
            idea.text = text;
        }
        if let Some(tags) = patch.tags {
            idea.tags = tags;
        }
        if let Some(mood) = patch.mood {
            idea.mood = mood;
        }
        if let Some(favorite) = patch.favorite {
            idea.favorite = favorite;
        }
        if let Some(status) = patch.status {
            idea.status = status;
        }
        if let Some(image_url) = patch.image_url {
            idea.image_url = image_url;
        }

        sqlx::query(
            "UPDATE ideas
             SET text = ?, tags = ?, mood = ?, favorite = ?, status = ?, image_url = ?, updated_at = ?
             WHERE id = ? AND user_id = ?",
        )
        .bind(&idea.text)
        .bind(serde_json::to_string(&idea.tags).unwrap_or_else(|_| "[]".into()))
        .bind(idea.mood.as_str())
        .bind(idea.favorite)
        .bind(idea.status.as_str())
        .bind(&idea.image_url)
        .bind(Utc::now())
        .bind(uuid_to_blob(id))
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn delete(&self, owner: &str, id: Uuid) -> Result<()> {
        // Idempotent by design: zero affected rows is still a success,
        // mirroring delete-by-filter semantics.
        sqlx::query("DELETE FROM ideas WHERE id = ? AND user_id = ?")
            .bind(uuid_to_blob(id))
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    /// Deliberately not owner-scoped: deduped image files are shared
    /// across owners, and cleanup must see every reference.
    async fn image_referenced(&self, url: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS refs FROM ideas WHERE image_url = ?")
            .bind(url)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.get::<i64, _>("refs") > 0)
    }
}
