//! Shipment service.

use chrono::Utc;
use tracing::{debug, info, instrument};

use flipledger_core::calc::dispatch_deadline;
use flipledger_core::{DeleteReport, SaleId, ShipmentId, ShipmentStatus};

use super::error::NotFoundExt;
use super::{ServiceContext, ServiceError};
use crate::models::{Page, Sale, Shipment, ShipmentFilter, ShipmentInput, ShipmentListing};

const ENTITY: &str = "shipment";

/// Shipment operations.
pub struct ShipmentService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> ShipmentService<'a> {
    #[must_use]
    pub const fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    /// Create a shipment for a sale.
    ///
    /// Without an explicit deadline the shipment is due the configured number
    /// of days after the sale date.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the sale does not exist.
    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        sale_id: SaleId,
        input: ShipmentInput,
    ) -> Result<Shipment, ServiceError> {
        let sale = self
            .ctx
            .store
            .get_sale(sale_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("sale", sale_id))?;

        let deadline = input.dispatch_deadline.unwrap_or_else(|| {
            dispatch_deadline(sale.date_sold, self.ctx.settings.dispatch_window_days)
        });
        let now = Utc::now();
        let mut shipment = Shipment {
            id: ShipmentId::generate(),
            sale_id,
            carrier: None,
            tracking_number: None,
            label_cost: input.label_cost,
            dispatch_deadline: Some(deadline),
            status: input.status,
            shipped_date: None,
            delivered_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        shipment.apply(input);
        shipment.stamp_status_date(self.ctx.today);

        self.ctx
            .store
            .insert_shipment(&shipment)
            .await
            .or_not_found("sale", sale_id)?;
        if shipment.status == ShipmentStatus::Shipped {
            self.sync_sale(sale, &shipment).await?;
        }

        info!(id = %shipment.id, sale_id = %sale_id, deadline = %deadline, "Created shipment");
        Ok(shipment)
    }

    /// Fetch one shipment.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such shipment.
    pub async fn get(&self, id: ShipmentId) -> Result<Shipment, ServiceError> {
        self.ctx
            .store
            .get_shipment(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))
    }

    /// Replace the editable fields. Moving to Shipped copies the tracking
    /// number and dispatch date onto the sale where it has none.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing shipment, or a validation error for a
    /// refused status change.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: ShipmentId,
        input: ShipmentInput,
    ) -> Result<Shipment, ServiceError> {
        let mut shipment = self.get(id).await?;
        let transition = self.ctx.check_status("status", shipment.status, input.status)?;

        shipment.apply(input);
        if transition.changed() {
            shipment.stamp_status_date(self.ctx.today);
        }
        shipment.updated_at = Utc::now();
        self.ctx
            .store
            .update_shipment(&shipment)
            .await
            .or_not_found(ENTITY, id)?;

        if transition.changed() && shipment.status == ShipmentStatus::Shipped {
            if let Some(sale) = self.ctx.store.get_sale(shipment.sale_id).await? {
                self.sync_sale(sale, &shipment).await?;
            }
        }

        info!(id = %shipment.id, status = %shipment.status, "Updated shipment");
        Ok(shipment)
    }

    /// Delete a shipment. The sale is untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such shipment.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ShipmentId) -> Result<DeleteReport, ServiceError> {
        let report = self
            .ctx
            .store
            .delete_shipment(id)
            .await
            .or_not_found(ENTITY, id)?;
        info!(id = %id, "Deleted shipment");
        Ok(report)
    }

    /// Filtered page of shipments with their sale's order details.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list(
        &self,
        filter: &ShipmentFilter,
        page: Page,
    ) -> Result<Vec<ShipmentListing>, ServiceError> {
        Ok(self.ctx.store.list_shipments(filter, page).await?)
    }

    async fn sync_sale(&self, mut sale: Sale, shipment: &Shipment) -> Result<(), ServiceError> {
        let mut changed = false;
        if sale.tracking_number.is_none() && shipment.tracking_number.is_some() {
            sale.tracking_number.clone_from(&shipment.tracking_number);
            changed = true;
        }
        if sale.shipped_date.is_none() && shipment.shipped_date.is_some() {
            sale.shipped_date = shipment.shipped_date;
            changed = true;
        }
        if changed {
            sale.updated_at = Utc::now();
            self.ctx.store.update_sale(&sale).await?;
            debug!(sale_id = %sale.id, "Copied dispatch details to sale");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{AppSettings, SaleInput};
    use crate::services::test_support::{store, strict, today};

    async fn sale(ctx: ServiceContext<'_>, date_sold: NaiveDate) -> Sale {
        ctx.sales()
            .record(SaleInput {
                order_id: "V-100".to_owned(),
                sale_price: dec!(20.00),
                date_sold: Some(date_sold),
                ..SaleInput::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_deadline_defaults_from_sale_date() {
        let store = store();
        let settings = AppSettings::default();
        let ctx = ServiceContext::new(&store, &settings, today());
        let sale = sale(ctx, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()).await;

        let shipment = ctx
            .shipments()
            .create(sale.id, ShipmentInput::default())
            .await
            .unwrap();
        assert_eq!(
            shipment.dispatch_deadline,
            NaiveDate::from_ymd_opt(2024, 6, 12)
        );
        assert!(shipment.is_overdue(today()));
    }

    #[tokio::test]
    async fn test_create_for_missing_sale_is_not_found() {
        let store = store();
        let settings = AppSettings::default();
        let ctx = ServiceContext::new(&store, &settings, today());
        let err = ctx
            .shipments()
            .create(SaleId::generate(), ShipmentInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(e) if e.entity == "sale"));
    }

    #[tokio::test]
    async fn test_shipping_copies_tracking_to_sale() {
        let store = store();
        let settings = AppSettings::default();
        let ctx = ServiceContext::new(&store, &settings, today());
        let sale = sale(ctx, today()).await;
        let shipment = ctx
            .shipments()
            .create(sale.id, ShipmentInput::default())
            .await
            .unwrap();

        let shipped = ctx
            .shipments()
            .update(
                shipment.id,
                ShipmentInput {
                    carrier: Some("Evri".to_owned()),
                    tracking_number: Some("TRK123".to_owned()),
                    status: ShipmentStatus::Shipped,
                    ..ShipmentInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(shipped.shipped_date, Some(today()));
        assert_eq!(shipped.dispatch_deadline, shipment.dispatch_deadline);
        assert!(!shipped.is_overdue(today()));

        let sale = ctx.sales().get(sale.id).await.unwrap();
        assert_eq!(sale.tracking_number.as_deref(), Some("TRK123"));
        assert_eq!(sale.shipped_date, Some(today()));
    }

    #[tokio::test]
    async fn test_strict_refuses_reopening_delivered() {
        let store = store();
        let settings = strict();
        let ctx = ServiceContext::new(&store, &settings, today());
        let sale = sale(ctx, today()).await;
        let shipment = ctx
            .shipments()
            .create(
                sale.id,
                ShipmentInput {
                    status: ShipmentStatus::Delivered,
                    ..ShipmentInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(shipment.delivered_date, Some(today()));

        let err = ctx
            .shipments()
            .update(shipment.id, ShipmentInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(e) if e.message_for("status").is_some()));
    }
}
