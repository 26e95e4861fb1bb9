pub mod handler;
pub mod registry;

pub use handler::Handler;
pub use registry::{clear, handlers, register, try_init, unregister, Dispatcher};
