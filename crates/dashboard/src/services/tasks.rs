//! Task service.

use chrono::Utc;
use tracing::{info, instrument};

use flipledger_core::{DeleteReport, InventoryItemId, TaskId, TaskStatus};

use super::error::NotFoundExt;
use super::{ServiceContext, ServiceError};
use crate::models::{Page, Task, TaskFilter, TaskInput};

const ENTITY: &str = "task";

/// Task operations.
pub struct TaskService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> TaskService<'a> {
    #[must_use]
    pub const fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    /// Create a task, optionally linked to an inventory item by SKU.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown `inventory_sku`.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, input: TaskInput) -> Result<Task, ServiceError> {
        let inventory_id = self.linked_item(input.inventory_sku.as_deref()).await?;
        let now = Utc::now();
        let mut task = Task {
            id: TaskId::generate(),
            title: String::new(),
            description: None,
            category: input.category,
            priority: input.priority,
            status: input.status,
            due_date: None,
            completed_date: None,
            inventory_id,
            created_at: now,
            updated_at: now,
        };
        task.apply(input);
        task.stamp_status_date(self.ctx.today);
        self.ctx.store.insert_task(&task).await?;

        info!(id = %task.id, priority = %task.priority, "Created task");
        Ok(task)
    }

    /// Fetch one task.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such task.
    pub async fn get(&self, id: TaskId) -> Result<Task, ServiceError> {
        self.ctx
            .store
            .get_task(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))
    }

    /// SKU of the linked item, for the edit form.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn linked_sku(&self, task: &Task) -> Result<Option<String>, ServiceError> {
        let Some(id) = task.inventory_id else {
            return Ok(None);
        };
        Ok(self.ctx.store.get_inventory(id).await?.map(|item| item.sku))
    }

    /// Replace every editable field.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing task or unknown `inventory_sku`, or a
    /// validation error for a refused status change.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: TaskId, input: TaskInput) -> Result<Task, ServiceError> {
        let mut task = self.get(id).await?;
        let transition = self.ctx.check_status("status", task.status, input.status)?;
        task.inventory_id = self.linked_item(input.inventory_sku.as_deref()).await?;

        task.apply(input);
        if transition.changed() {
            task.stamp_status_date(self.ctx.today);
        }
        self.save(&mut task).await?;

        info!(id = %task.id, status = %task.status, "Updated task");
        Ok(task)
    }

    /// Change only the status, e.g. from the list's quick actions.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing task, or a validation error for a
    /// refused status change.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<Task, ServiceError> {
        let mut task = self.get(id).await?;
        let transition = self.ctx.check_status("status", task.status, status)?;
        if !transition.changed() {
            return Ok(task);
        }

        task.status = status;
        task.stamp_status_date(self.ctx.today);
        self.save(&mut task).await?;

        info!(id = %task.id, status = %task.status, "Changed task status");
        Ok(task)
    }

    /// Delete a task.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such task.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: TaskId) -> Result<DeleteReport, ServiceError> {
        let report = self
            .ctx
            .store
            .delete_task(id)
            .await
            .or_not_found(ENTITY, id)?;
        info!(id = %id, "Deleted task");
        Ok(report)
    }

    /// Filtered page of tasks in the filter's order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list(&self, filter: &TaskFilter, page: Page) -> Result<Vec<Task>, ServiceError> {
        Ok(self.ctx.store.list_tasks(filter, page).await?)
    }

    async fn save(&self, task: &mut Task) -> Result<(), ServiceError> {
        task.updated_at = Utc::now();
        self.ctx
            .store
            .update_task(task)
            .await
            .or_not_found(ENTITY, task.id)
    }

    async fn linked_item(&self, sku: Option<&str>) -> Result<Option<InventoryItemId>, ServiceError> {
        let Some(sku) = sku else {
            return Ok(None);
        };
        self.ctx
            .store
            .get_inventory_by_sku(sku)
            .await?
            .map(|item| Some(item.id))
            .ok_or_else(|| ServiceError::not_found("inventory item", sku))
    }
}
