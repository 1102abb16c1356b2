pub mod consent;
pub mod saved_filter;
pub mod subscription;
