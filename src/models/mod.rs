//! Data models
//!
//! Database entities shared by the repositories, services and templates.

mod category;
mod page;
mod session;
mod user;

pub use category::Category;
pub use page::Page;
pub use session::Session;
pub use user::{User, UserProfile};
