//! A small item catalogue served through `route_kit`.

pub mod controllers;
pub mod dtos;
pub mod error;
pub mod rules;

use route_kit::{ApiFramework, FrameworkConfig};

use controllers::{CategoryController, CategoryStore, ItemController};

/// Prefix every generated route is mounted under.
pub const API_PREFIX: &str = "/api";

pub fn build_framework(config: FrameworkConfig) -> route_kit::Result<ApiFramework> {
    rules::install();
    let mut framework = ApiFramework::new().with_config(config);
    framework.set_context_value("service", "item-service");

    let categories = CategoryStore::default();
    framework.register_controller(API_PREFIX, ItemController::new(categories.clone()))?;
    framework.register_controller(API_PREFIX, CategoryController::new(categories))?;
    Ok(framework)
}
