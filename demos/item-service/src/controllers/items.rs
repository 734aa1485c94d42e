use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use route_kit::{controller, DeletedAt, FrameworkHandle, RequestContext};
use tracing::{debug, info};

use super::categories::CategoryStore;
use crate::dtos::items::{
    CreateItemReq, DeleteItemReq, DeleteRes, GetItemReq, Item, ItemRes, ListItemsReq, ListRes,
    UpdateItemReq,
};
use crate::error::ServiceError;

const DEFAULT_PAGE_SIZE: u32 = 20;

/// In-memory item catalogue.
#[derive(Default)]
pub struct ItemController {
    handle: FrameworkHandle,
    categories: CategoryStore,
    items: RwLock<BTreeMap<u64, Item>>,
    next_id: AtomicU64,
}

impl ItemController {
    pub fn new(categories: CategoryStore) -> Self {
        ItemController {
            categories,
            ..Default::default()
        }
    }

    fn insert(&self, mut item: Item) -> Result<Item, ServiceError> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if items.values().any(|existing| existing.sku == item.sku) {
            return Err(ServiceError::DuplicateSku(item.sku));
        }
        item.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        items.insert(item.id, item.clone());
        Ok(item)
    }

    fn live(&self, id: u64) -> Result<Item, ServiceError> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .filter(|item| item.deleted_at.0.is_none())
            .cloned()
            .ok_or(ServiceError::ItemNotFound(id))
    }
}

#[controller(name = "Items", handle = handle)]
impl ItemController {
    /// Seeds a couple of items so a fresh service has something to list.
    fn initialize(&mut self, handle: &FrameworkHandle) -> Result<(), ServiceError> {
        for (sku, name, price) in [("BOLT-M6", "Hex bolt M6", 0.12), ("NUT-M6", "Hex nut M6", 0.05)] {
            self.insert(Item {
                sku: sku.to_string(),
                name: name.to_string(),
                unit_price: price,
                tags: vec!["hardware".to_string()],
                created_at: Utc::now(),
                ..Default::default()
            })?;
        }
        debug!(title = %handle.config().title, "seeded item catalogue");
        Ok(())
    }

    pub async fn list(&self, ctx: RequestContext, req: ListItemsReq) -> Result<ListRes, ServiceError> {
        let keyword = req.keyword.as_deref().map(str::to_lowercase);
        let matched: Vec<Item> = self
            .items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|item| req.include_deleted || item.deleted_at.0.is_none())
            .filter(|item| {
                keyword.as_deref().map_or(true, |k| {
                    item.name.to_lowercase().contains(k) || item.sku.to_lowercase().contains(k)
                })
            })
            .filter(|item| req.tag.iter().all(|tag| item.tags.contains(tag)))
            .cloned()
            .collect();

        let size = match req.paging.size {
            0 => DEFAULT_PAGE_SIZE as usize,
            size => size as usize,
        };
        let page = req.paging.page.max(1) as usize;
        let total = matched.len();
        let items = matched.into_iter().skip((page - 1) * size).take(size).collect();
        Ok(ListRes {
            items,
            total,
            served_by: ctx
                .value("service")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }

    pub async fn get(&self, _ctx: RequestContext, req: GetItemReq) -> Result<ItemRes, ServiceError> {
        Ok(ItemRes {
            item: self.live(req.id)?,
        })
    }

    pub async fn create(&self, ctx: RequestContext, req: CreateItemReq) -> Result<ItemRes, ServiceError> {
        let category = match req.category_id {
            Some(id) => Some(
                self.categories
                    .get(id)
                    .ok_or(ServiceError::CategoryNotFound(id))?,
            ),
            None => None,
        };
        let item = self.insert(Item {
            sku: req.sku,
            name: req.name,
            unit_price: req.unit_price,
            tags: req.tags,
            attributes: req.attributes,
            category,
            created_at: Utc::now(),
            ..Default::default()
        })?;
        info!(
            id = item.id,
            sku = %item.sku,
            region = ?self.handle.context_value("region"),
            path = ctx.path(),
            "created item"
        );
        Ok(ItemRes { item })
    }

    pub async fn update(&self, _ctx: RequestContext, req: UpdateItemReq) -> Result<ItemRes, ServiceError> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let item = items
            .get_mut(&req.id)
            .filter(|item| item.deleted_at.0.is_none())
            .ok_or(ServiceError::ItemNotFound(req.id))?;
        if let Some(name) = req.name {
            item.name = name;
        }
        if let Some(price) = req.unit_price {
            item.unit_price = price;
        }
        if let Some(tags) = req.tags {
            item.tags = tags;
        }
        Ok(ItemRes { item: item.clone() })
    }

    pub async fn delete(&self, _ctx: RequestContext, req: DeleteItemReq) -> Result<DeleteRes, ServiceError> {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let removed = if req.force {
            items.remove(&req.id).is_some()
        } else {
            match items.get_mut(&req.id) {
                Some(item) if item.deleted_at.0.is_none() => {
                    item.deleted_at = DeletedAt(Some(Utc::now()));
                    true
                }
                _ => false,
            }
        };
        if !removed {
            return Err(ServiceError::ItemNotFound(req.id));
        }
        Ok(DeleteRes { id: req.id, removed })
    }
}
