pub mod billing;
pub mod consent;
pub mod http;
pub mod saved_filters;
pub mod subscription;
