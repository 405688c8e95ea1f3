//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! All operations are owner-scoped: a repo must never return or mutate
//! a row belonging to a different user than the one passed in.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Idea, IdeaDraft, IdeaPatch, Session};

/// Data persistence contract for ideas.
#[async_trait]
pub trait IdeaRepo: Send + Sync {
    /// All ideas for the owner, newest first (`created_at` descending).
    async fn list(&self, owner: &str) -> Result<Vec<Idea>>;

    /// Inserts a new idea; the store assigns id and both timestamps.
    /// Fails with `Validation` if the draft text is empty.
    async fn create(&self, owner: &str, draft: IdeaDraft) -> Result<Idea>;

    /// Merges the patch into an existing row and restamps `updated_at`.
    /// Fails with `NotFound` if the id is absent or owned by someone else.
    async fn update(&self, owner: &str, id: Uuid, patch: IdeaPatch) -> Result<()>;

    /// Removes the row. Idempotent: deleting an absent id succeeds.
    async fn delete(&self, owner: &str, id: Uuid) -> Result<()>;

    /// True if any stored idea, regardless of owner, references the
    /// image URL. Content-addressed storage dedups identical files, so
    /// one URL may back ideas across owners; orphan cleanup must check
    /// this before removing anything.
    async fn image_referenced(&self, url: &str) -> Result<bool>;
}

/// Object storage contract for attached images.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores raw bytes and returns a publicly dereferenceable URL.
    /// The object must be durable before any idea references it.
    async fn save_upload(&self, data: Vec<u8>, filename: &str) -> Result<String>;

    /// Compensation hook: removes a previously stored object so a failed
    /// idea write does not leak an orphaned upload. Idempotent.
    async fn remove(&self, url: &str) -> Result<()>;
}

/// Identity and session contract. The core only ever needs the current
/// user id to scope repo calls, plus sign-in/sign-out.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Verifies credentials and opens a session.
    async fn sign_in(&self, username: &str, password: &str) -> Result<Session>;

    /// Resolves a bearer token to a user id, or `Unauthenticated`.
    async fn current_user(&self, token: &str) -> Result<String>;

    /// Closes a session. Idempotent.
    async fn sign_out(&self, token: &str) -> Result<()>;
}
