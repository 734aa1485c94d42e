use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use route_kit::{ApiModel, DeletedAt, Meta};
use serde::{Deserialize, Serialize};

use super::categories::Category;

/// An item in the catalogue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ApiModel)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: u64,
    #[api(description = "Stock keeping unit, upper-case letters, digits and dashes")]
    pub sku: String,
    pub name: String,
    pub unit_price: f64,
    pub tags: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: DeletedAt,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ApiModel)]
pub struct Paging {
    #[api(description = "1-based page number")]
    pub page: u32,
    #[api(description = "Page size, defaults to 20")]
    pub size: u32,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
pub struct ListItemsReq {
    #[serde(skip)]
    #[api(path = "/items", method = "GET", summary = "List items", tags = "items")]
    pub meta: Meta,
    #[serde(flatten)]
    pub paging: Paging,
    #[api(p = "q", description = "Matches name or sku")]
    pub keyword: Option<String>,
    #[api(description = "Items carrying every listed tag")]
    pub tag: Vec<String>,
    #[serde(rename = "includeDeleted")]
    pub include_deleted: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
#[serde(rename_all = "camelCase")]
pub struct ListRes {
    pub items: Vec<Item>,
    pub total: usize,
    pub served_by: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
pub struct GetItemReq {
    #[serde(skip)]
    #[api(path = "/items/{id}", method = "GET", summary = "Get an item", tags = "items")]
    pub meta: Meta,
    #[api(v = "required")]
    pub id: u64,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemReq {
    #[serde(skip)]
    #[api(path = "/items", method = "POST", summary = "Create an item", tags = "items")]
    pub meta: Meta,
    #[api(v = "required|sku")]
    pub sku: String,
    #[api(v = "required#name is required")]
    pub name: String,
    #[api(v = "required")]
    pub unit_price: f64,
    pub tags: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub category_id: Option<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemReq {
    #[serde(skip)]
    #[api(path = "/items", method = "PUT", summary = "Update an item", tags = "items")]
    pub meta: Meta,
    #[api(v = "required")]
    pub id: u64,
    pub name: Option<String>,
    pub unit_price: Option<f64>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
pub struct DeleteItemReq {
    #[serde(skip)]
    #[api(path = "/items", method = "DELETE", summary = "Delete an item", tags = "items")]
    pub meta: Meta,
    #[api(v = "required")]
    pub id: u64,
    #[api(description = "Remove instead of marking deleted")]
    pub force: bool,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
pub struct ItemRes {
    pub item: Item,
}

#[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
pub struct DeleteRes {
    pub id: u64,
    pub removed: bool,
}
