//! Poll server: registered users create multiple-choice polls, anyone votes,
//! and the running tallies are served back for rendering.
//!
//! # Layout
//! - [`credentials`]: registration and Argon2 password verification
//! - [`session`]: opaque session tokens with inactivity expiry
//! - [`gate`]: the capability check in front of poll creation
//! - [`poll`] / [`vote`]: poll creation, lookup and the atomic vote increment
//! - [`store`]: `UserStore`/`PollStore` traits with in-memory and Postgres backends
//! - [`handlers`] / [`routes`]: the axum HTTP surface
//!
//! Page templates are not part of this crate; handlers pass view data to the
//! [`render::Render`] installed in [`state::AppState`].

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod poll;
pub mod render;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;
pub mod vote;

pub use config::Config;
pub use error::AppError;
pub use routes::create_routes;
pub use state::AppState;
