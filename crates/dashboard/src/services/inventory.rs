//! Inventory service.

use chrono::Utc;
use tracing::{info, instrument};

use flipledger_core::{DeleteReport, InventoryItemId, ValidationError};

use super::error::NotFoundExt;
use super::{ServiceContext, ServiceError};
use crate::models::{InventoryFilter, InventoryInput, InventoryItem, Page};

const ENTITY: &str = "inventory item";

/// Inventory item operations.
pub struct InventoryService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> InventoryService<'a> {
    #[must_use]
    pub const fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    /// Record a new item.
    ///
    /// # Errors
    ///
    /// Returns a validation error on `sku` if it is already in use.
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create(&self, input: InventoryInput) -> Result<InventoryItem, ServiceError> {
        if self.ctx.store.get_inventory_by_sku(&input.sku).await?.is_some() {
            return Err(ValidationError::field("sku", "already exists").into());
        }

        let mut item = InventoryItem::from_input(input, Utc::now())?;
        item.stamp_status_date(self.ctx.today);
        self.ctx.store.insert_inventory(&item).await?;

        info!(id = %item.id, status = %item.listing_status, "Created inventory item");
        Ok(item)
    }

    /// Fetch one item.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such item.
    pub async fn get(&self, id: InventoryItemId) -> Result<InventoryItem, ServiceError> {
        self.ctx
            .store
            .get_inventory(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))
    }

    /// Replace every editable field, recompute profit and ROI, and check the
    /// status change.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing item, or a validation error for a
    /// duplicate SKU or a refused status change.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: InventoryItemId,
        input: InventoryInput,
    ) -> Result<InventoryItem, ServiceError> {
        let mut item = self.get(id).await?;

        if !item.sku.eq_ignore_ascii_case(&input.sku)
            && self.ctx.store.get_inventory_by_sku(&input.sku).await?.is_some()
        {
            return Err(ValidationError::field("sku", "already exists").into());
        }

        let transition =
            self.ctx
                .check_status("listing_status", item.listing_status, input.listing_status)?;

        item.apply(input)?;
        if transition.changed() {
            item.stamp_status_date(self.ctx.today);
        }
        item.updated_at = Utc::now();
        self.ctx.store.update_inventory(&item).await?;

        info!(id = %item.id, status = %item.listing_status, "Updated inventory item");
        Ok(item)
    }

    /// Persist an item changed by another service.
    pub(crate) async fn save(&self, item: &mut InventoryItem) -> Result<(), ServiceError> {
        item.recompute()?;
        item.updated_at = Utc::now();
        self.ctx.store.update_inventory(item).await?;
        Ok(())
    }

    /// Delete an item. Sales and tasks that pointed at it keep existing,
    /// unlinked.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such item.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: InventoryItemId) -> Result<DeleteReport, ServiceError> {
        let report = self
            .ctx
            .store
            .delete_inventory(id)
            .await
            .or_not_found(ENTITY, id)?;
        info!(id = %id, detached = report.detached, "Deleted inventory item");
        Ok(report)
    }

    /// Filtered, newest-first page of items.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list(
        &self,
        filter: &InventoryFilter,
        page: Page,
    ) -> Result<Vec<InventoryItem>, ServiceError> {
        Ok(self.ctx.store.list_inventory(filter, page).await?)
    }

    /// Distinct brands for the filter dropdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn brands(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.ctx.store.inventory_brands().await?)
    }
}
