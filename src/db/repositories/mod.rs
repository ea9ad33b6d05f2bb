//! Repository layer
//!
//! Every table except `sessions` is served by the generic
//! [`SqlxRepository`]; the per-domain modules only describe how their
//! entities map to rows.

mod catalog;
mod entity;
mod film;
mod repository;
pub mod session;
pub mod user;

pub use entity::{Entity, RowReader, SqlValue};
pub use repository::{ListFilter, Listing, Repository, SqlxRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
