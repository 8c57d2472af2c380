pub mod health_handlers;
pub mod lifecycle_handlers;
