use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::outfit::{Category, NewOutfit, Outfit};
use crate::store::OutfitStore;

/// Process-local store used when no database is configured, and in tests.
/// Records are lost on restart.
#[derive(Default)]
pub struct MemoryOutfitStore {
    // insertion order; reads walk it backwards for newest-first
    outfits: RwLock<Vec<Outfit>>,
}

impl MemoryOutfitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutfitStore for MemoryOutfitStore {
    async fn insert(&self, outfit: NewOutfit) -> Result<Outfit, AppError> {
        let record = Outfit::create(outfit, Uuid::new_v4(), Utc::now());
        self.outfits.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(
        &self,
        user_id: Uuid,
        category: Option<Category>,
    ) -> Result<Vec<Outfit>, AppError> {
        let outfits = self.outfits.read().await;
        Ok(outfits
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .filter(|o| category.map_or(true, |c| o.category == c))
            .cloned()
            .collect())
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<Outfit>, AppError> {
        let outfits = self.outfits.read().await;
        Ok(outfits
            .iter()
            .find(|o| o.id == id && o.user_id == user_id)
            .cloned())
    }

    async fn toggle_favorite(&self, user_id: Uuid, id: Uuid) -> Result<Option<Outfit>, AppError> {
        let mut outfits = self.outfits.write().await;
        Ok(outfits
            .iter_mut()
            .find(|o| o.id == id && o.user_id == user_id)
            .map(|o| {
                o.favorite = !o.favorite;
                o.clone()
            }))
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Option<Outfit>, AppError> {
        let mut outfits = self.outfits.write().await;
        let position = outfits
            .iter()
            .position(|o| o.id == id && o.user_id == user_id);
        Ok(position.map(|i| outfits.remove(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::new_outfit;

    #[tokio::test]
    async fn test_insert_starts_unfavorited_and_lists_newest_first() {
        let store = MemoryOutfitStore::new();
        let user = Uuid::new_v4();
        let first = store.insert(new_outfit(user, Category::Casual, 6)).await.unwrap();
        let second = store.insert(new_outfit(user, Category::Formal, 8)).await.unwrap();

        assert!(!first.favorite);
        let listed = store.list(user, None).await.unwrap();
        assert_eq!(
            listed.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[tokio::test]
    async fn test_list_filters_by_category_and_owner() {
        let store = MemoryOutfitStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.insert(new_outfit(alice, Category::Party, 7)).await.unwrap();
        store.insert(new_outfit(alice, Category::Casual, 5)).await.unwrap();
        store.insert(new_outfit(bob, Category::Party, 9)).await.unwrap();

        let parties = store.list(alice, Some(Category::Party)).await.unwrap();
        assert_eq!(parties.len(), 1);
        assert_eq!(parties[0].user_id, alice);
        assert_eq!(store.list(bob, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_value() {
        let store = MemoryOutfitStore::new();
        let user = Uuid::new_v4();
        let outfit = store.insert(new_outfit(user, Category::Street, 7)).await.unwrap();

        let once = store.toggle_favorite(user, outfit.id).await.unwrap().unwrap();
        assert!(once.favorite);
        let twice = store.toggle_favorite(user, outfit.id).await.unwrap().unwrap();
        assert!(!twice.favorite);
    }

    #[tokio::test]
    async fn test_other_users_records_are_invisible() {
        let store = MemoryOutfitStore::new();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let outfit = store.insert(new_outfit(owner, Category::Business, 8)).await.unwrap();

        assert!(store.get(intruder, outfit.id).await.unwrap().is_none());
        assert!(store.toggle_favorite(intruder, outfit.id).await.unwrap().is_none());
        assert!(store.delete(intruder, outfit.id).await.unwrap().is_none());
        assert!(!store.get(owner, outfit.id).await.unwrap().unwrap().favorite);
    }

    #[tokio::test]
    async fn test_delete_returns_record_once() {
        let store = MemoryOutfitStore::new();
        let user = Uuid::new_v4();
        let outfit = store.insert(new_outfit(user, Category::Athletic, 4)).await.unwrap();

        let deleted = store.delete(user, outfit.id).await.unwrap().unwrap();
        assert_eq!(deleted.image_ref, outfit.image_ref);
        assert!(store.delete(user, outfit.id).await.unwrap().is_none());
        assert!(store.list(user, None).await.unwrap().is_empty());
    }
}
