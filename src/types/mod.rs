//! Core value types.

mod server_url;
mod user;

pub use server_url::ServerUrl;
pub use user::User;
