//! Standard node library
//!
//! Built-in module nodes registered in the prototype registry. Each
//! node ships a factory so that every resolution yields a fresh
//! instance.

mod api_call;
mod echo;
mod log;
mod mapper;

pub use api_call::{ApiCallFactory, ApiCallNode};
pub use echo::{EchoFactory, EchoNode};
pub use log::{LogFactory, LogNode};
pub use mapper::{MapperFactory, MapperNode};

use std::sync::Arc;
use wfruntime::NodeRegistry;

/// Register all standard nodes with a registry.
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(api_call::ApiCallFactory));
    registry.register(Arc::new(echo::EchoFactory));
    registry.register(Arc::new(log::LogFactory));
    registry.register(Arc::new(mapper::MapperFactory));
}
