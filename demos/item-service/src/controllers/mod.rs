pub mod categories;
pub mod items;

pub use categories::{CategoryController, CategoryStore};
pub use items::ItemController;
