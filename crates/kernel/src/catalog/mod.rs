//! Catalog services: categories and customs.

mod category_service;
mod custom_service;

pub use category_service::{CategoryService, CategorySelector};
pub use custom_service::CustomService;
