use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::outfit::{Category, NewOutfit, Outfit, OutfitRow};
use crate::store::OutfitStore;

const OUTFIT_COLUMNS: &str = "id, user_id, image_ref, category, rating, style_analysis, \
     mood, occasion, season, favorite, created_at";

#[derive(Clone)]
pub struct PgOutfitStore {
    pool: PgPool,
}

impl PgOutfitStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_outfit(row: OutfitRow) -> Result<Outfit, AppError> {
    Outfit::try_from(row).map_err(AppError::Internal)
}

#[async_trait]
impl OutfitStore for PgOutfitStore {
    async fn insert(&self, outfit: NewOutfit) -> Result<Outfit, AppError> {
        let style_analysis = outfit.analysis.style_analysis();
        let row: OutfitRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO outfits
                (id, user_id, image_ref, category, rating, style_analysis,
                 mood, occasion, season, favorite)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE)
            RETURNING {OUTFIT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(outfit.user_id)
        .bind(&outfit.image_ref)
        .bind(outfit.analysis.category.as_str())
        .bind(i16::from(outfit.analysis.overall_rating))
        .bind(Json(&style_analysis))
        .bind(&outfit.context.mood)
        .bind(&outfit.context.occasion)
        .bind(outfit.context.season.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;

        into_outfit(row)
    }

    async fn list(
        &self,
        user_id: Uuid,
        category: Option<Category>,
    ) -> Result<Vec<Outfit>, AppError> {
        let rows: Vec<OutfitRow> = sqlx::query_as(&format!(
            r#"
            SELECT {OUTFIT_COLUMNS}
            FROM outfits
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .bind(category.map(|c| c.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_outfit).collect()
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Outfit>, AppError> {
        let row: Option<OutfitRow> = sqlx::query_as(&format!(
            "SELECT {OUTFIT_COLUMNS} FROM outfits WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_outfit).transpose()
    }

    async fn toggle_favorite(&self, user_id: Uuid, id: Uuid) -> Result<Option<Outfit>, AppError> {
        let row: Option<OutfitRow> = sqlx::query_as(&format!(
            r#"
            UPDATE outfits SET favorite = NOT favorite
            WHERE id = $1 AND user_id = $2
            RETURNING {OUTFIT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_outfit).transpose()
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Option<Outfit>, AppError> {
        let row: Option<OutfitRow> = sqlx::query_as(&format!(
            "DELETE FROM outfits WHERE id = $1 AND user_id = $2 RETURNING {OUTFIT_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(into_outfit).transpose()
    }
}
