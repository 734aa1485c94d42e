use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("item {0} not found")]
    ItemNotFound(u64),
    #[error("sku {0} already exists")]
    DuplicateSku(String),
    #[error("category {0} not found")]
    CategoryNotFound(u32),
}
