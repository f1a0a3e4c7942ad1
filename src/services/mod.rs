//! Services layer - Business logic
//!
//! Services validate input, enforce uniqueness rules and coordinate the
//! repositories. Handlers only talk to services.

pub mod category;
pub mod page;
pub mod password;
pub mod slug;
pub mod user;
pub mod visits;

pub use category::{CategoryService, CategoryServiceError};
pub use page::{PageService, PageServiceError};
pub use password::{hash_password, verify_password};
pub use slug::slugify;
pub use user::{ProfilePicture, UserService, UserServiceError};
pub use visits::VisitCounter;
