//! Outfit Store: durable, per-user collection of analyzed outfits.
//!
//! Every operation is scoped by owner. A record owned by someone else is
//! reported exactly like a missing one (`None`), so callers cannot probe for
//! other users' ids.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::outfit::{Category, NewOutfit, Outfit};

pub mod memory;
pub mod postgres;

pub use memory::MemoryOutfitStore;
pub use postgres::PgOutfitStore;

#[async_trait]
pub trait OutfitStore: Send + Sync {
    /// Persists a new outfit with `favorite = false` and a fresh id.
    async fn insert(&self, outfit: NewOutfit) -> Result<Outfit, AppError>;

    /// The user's outfits, newest first, optionally limited to one category.
    async fn list(&self, user_id: Uuid, category: Option<Category>)
        -> Result<Vec<Outfit>, AppError>;

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Outfit>, AppError>;

    /// Flips `favorite` in one atomic step and returns the updated record.
    async fn toggle_favorite(&self, user_id: Uuid, id: Uuid) -> Result<Option<Outfit>, AppError>;

    /// Removes the record and returns it so the caller can release its photo.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Option<Outfit>, AppError>;
}
