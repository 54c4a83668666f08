mod event;
mod todo;
mod unit;
mod user;

pub use event::*;
pub use todo::*;
pub use unit::*;
pub use user::*;
