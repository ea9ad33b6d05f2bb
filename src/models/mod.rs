//! Data models
//!
//! Stored entities of the catalog (categories, products and their images),
//! of the film library (thematics, movies and their images) and of user
//! accounts. Identities are 0 until the database assigns one.

mod category;
mod movie;
mod product;
mod session;
mod thematic;
mod user;

pub use category::Category;
pub use movie::{Movie, MovieImage};
pub use product::{Product, ProductImage, MAX_PRICE, MIN_PRICE};
pub use session::Session;
pub use thematic::Thematic;
pub use user::{User, UserStatus};
