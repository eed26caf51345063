//! Username/password authentication over cookie sessions.

pub mod db;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod strategy;

pub use handlers::*;
pub use middleware::{authorize, rehydrate_identity, Identity};
pub use strategy::{verify, AuthError};
