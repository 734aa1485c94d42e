use route_kit::{ApiModel, Meta};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, ApiModel)]
pub struct Category {
    pub id: u32,
    pub name: String,
    /// A category can have a parent, creating a recursive structure.
    pub parent: Option<Box<Category>>,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
pub struct ListCategoriesReq {
    #[serde(skip)]
    #[api(path = "/categories", method = "GET", summary = "List categories", tags = "categories")]
    pub meta: Meta,
}

/// Same type name as the item listing; the document keeps both apart.
#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
pub struct ListRes {
    pub categories: Vec<Category>,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
pub struct CreateCategoryReq {
    #[serde(skip)]
    #[api(path = "/categories", method = "POST", summary = "Create a category", tags = "categories")]
    pub meta: Meta,
    #[api(v = "required")]
    pub name: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
pub struct CategoryRes {
    pub category: Category,
}
