mod consumer;
mod consumer_runtime;
mod event_consumer_impl;
mod event_handler_impl;
mod event_publisher_impl;
mod port;
mod server;

pub use consumer::*;
pub use consumer_runtime::*;
pub use event_consumer_impl::*;
pub use event_handler_impl::*;
pub use event_publisher_impl::*;
pub use port::*;
pub use server::*;
