// Wardrobe: upload, browse, favorite, delete.

pub mod handlers;
pub mod upload;
