mod auth_service;
mod todo_service;
mod user_service;

pub use auth_service::*;
pub use todo_service::*;
pub use user_service::*;
