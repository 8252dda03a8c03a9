pub mod outfit;
pub mod user;
