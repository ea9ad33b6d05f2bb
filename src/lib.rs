//! Showcase - catalog and film library admin backend
//!
//! Products grouped in categories, movies grouped in thematics, images for
//! both, and user accounts with email verification and password reset.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod pager;
pub mod services;
pub mod slug;
