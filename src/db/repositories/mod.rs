//! Database repositories
//!
//! One repository per entity, each a trait plus an `Sqlx*` implementation
//! that works on both SQLite and MySQL.

pub mod category;
pub mod page;
pub mod session;
pub mod user;
pub mod user_profile;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use page::{PageRepository, SqlxPageRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use user_profile::{SqlxUserProfileRepository, UserProfileRepository};
