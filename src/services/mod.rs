//! Services layer - Business logic
//!
//! Services validate input, enforce the existence checks that the
//! repositories leave out and coordinate repositories with the file store.

pub mod catalog;
pub mod error;
pub mod file_store;
pub mod film;
pub mod password;
pub mod user;
pub mod validation;

pub use catalog::{CatalogService, CategoryInput, ProductInput};
pub use error::{ServiceError, ValidationError};
pub use file_store::{FileStore, LocalFileStore, Upload, MOVIE_IMAGES, PRODUCT_IMAGES};
pub use film::{FilmService, MovieInput, ThematicInput};
pub use password::{hash_password, verify_password};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
