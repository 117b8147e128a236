pub mod auth;
pub mod event;
pub mod integration;
pub mod message;
pub mod notification;
pub mod post;
pub mod room;
pub mod state;
pub mod user;
pub mod validation;
