pub mod auth;
pub mod health;
pub mod ious;
pub mod requests;
