pub mod admin;
pub mod album;
pub mod auth;
pub mod comment;
pub mod photo;
pub mod users;
