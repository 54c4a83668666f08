mod auth_service_impl;
mod credential_hasher;
mod jwt_codec;
mod refresh_token;
mod todo_service_impl;
mod user_service_impl;

pub use auth_service_impl::*;
pub use credential_hasher::*;
pub use jwt_codec::*;
pub use refresh_token::*;
pub use todo_service_impl::*;
pub use user_service_impl::*;
