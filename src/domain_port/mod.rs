// store

mod session_store;

pub use session_store::*;

// repo

mod todo_repo;
mod user_repo;

mod repo_tx;

pub use todo_repo::*;
pub use user_repo::*;

pub use repo_tx::*;

// messaging

mod event_publisher;

pub use event_publisher::*;
