use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use route_kit::{controller, RequestContext};

use crate::dtos::categories::{Category, CategoryRes, CreateCategoryReq, ListCategoriesReq, ListRes};
use crate::error::ServiceError;

/// Category tree shared with the item controller.
#[derive(Debug, Clone, Default)]
pub struct CategoryStore {
    inner: Arc<RwLock<BTreeMap<u32, Category>>>,
}

impl CategoryStore {
    pub fn get(&self, id: u32) -> Option<Category> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn insert(&self, name: String, parent_id: Option<u32>) -> Result<Category, ServiceError> {
        let mut categories = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let parent = match parent_id {
            Some(id) => Some(Box::new(
                categories
                    .get(&id)
                    .cloned()
                    .ok_or(ServiceError::CategoryNotFound(id))?,
            )),
            None => None,
        };
        let id = categories.keys().next_back().map_or(1, |last| last + 1);
        let category = Category { id, name, parent };
        categories.insert(id, category.clone());
        Ok(category)
    }

    pub fn all(&self) -> Vec<Category> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

#[derive(Default)]
pub struct CategoryController {
    store: CategoryStore,
}

impl CategoryController {
    pub fn new(store: CategoryStore) -> Self {
        CategoryController { store }
    }
}

#[controller(name = "Categories")]
impl CategoryController {
    pub async fn list(&self, _ctx: RequestContext, _req: ListCategoriesReq) -> Result<ListRes, ServiceError> {
        Ok(ListRes {
            categories: self.store.all(),
        })
    }

    pub async fn create(&self, _ctx: RequestContext, req: CreateCategoryReq) -> Result<CategoryRes, ServiceError> {
        let category = self.store.insert(req.name, req.parent_id)?;
        tracing::info!(id = category.id, name = %category.name, "created category");
        Ok(CategoryRes { category })
    }
}
