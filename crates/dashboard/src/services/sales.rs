//! Sales service.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use flipledger_core::calc::percentage_of;
use flipledger_core::{DeleteReport, ListingStatus, SaleId, ValidationError};

use super::error::NotFoundExt;
use super::{ServiceContext, ServiceError};
use crate::models::{InventoryItem, Page, Sale, SaleFilter, SaleInput, SalesTotals};

const ENTITY: &str = "sale";

/// Sale operations.
pub struct SaleService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> SaleService<'a> {
    #[must_use]
    pub const fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    /// Record a sale. A linked inventory item is marked sold.
    ///
    /// Platform fees default to the platform's configured percentage of the
    /// sale price; payment processing fees default to zero.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown `inventory_sku`, or a validation
    /// error for a duplicate order id or a refused item status change.
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn record(&self, input: SaleInput) -> Result<Sale, ServiceError> {
        if self
            .ctx
            .store
            .get_sale_by_order_id(&input.order_id)
            .await?
            .is_some()
        {
            return Err(ValidationError::field("order_id", "already exists").into());
        }

        let item = self.linked_item(input.inventory_sku.as_deref()).await?;
        let now = Utc::now();
        let mut sale = Sale {
            id: SaleId::generate(),
            order_id: String::new(),
            inventory_id: None,
            platform: input.platform,
            item_name: None,
            sale_price: Decimal::ZERO,
            platform_fees: Decimal::ZERO,
            payment_processing_fees: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            buyer_paid_shipping: false,
            net_profit: Decimal::ZERO,
            date_sold: self.ctx.today,
            shipped_date: None,
            tracking_number: None,
            payout_status: input.payout_status,
            buyer_name: None,
            buyer_username: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.fill(&mut sale, input, item.as_ref())?;

        let item = item.map(|item| self.mark_sold(item, &sale)).transpose()?;
        self.ctx.store.insert_sale(&sale).await?;
        if let Some(mut item) = item {
            self.ctx.inventory().save(&mut item).await?;
        }

        info!(id = %sale.id, net_profit = %sale.net_profit, "Recorded sale");
        Ok(sale)
    }

    /// Fetch one sale.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such sale.
    pub async fn get(&self, id: SaleId) -> Result<Sale, ServiceError> {
        self.ctx
            .store
            .get_sale(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))
    }

    /// SKU of the item a sale is linked to, for the edit form.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn linked_sku(&self, sale: &Sale) -> Result<Option<String>, ServiceError> {
        let Some(id) = sale.inventory_id else {
            return Ok(None);
        };
        Ok(self.ctx.store.get_inventory(id).await?.map(|item| item.sku))
    }

    /// Replace every editable field and recompute net profit.
    ///
    /// Moving the link to another item, or clearing it, leaves the previously
    /// linked item in Sold with its old sale price. The change is logged at
    /// `warn` so it can be corrected by hand.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing sale or unknown `inventory_sku`, or a
    /// validation error for a duplicate order id or refused status change.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: SaleId, input: SaleInput) -> Result<Sale, ServiceError> {
        let mut sale = self.get(id).await?;

        if sale.order_id != input.order_id
            && self
                .ctx
                .store
                .get_sale_by_order_id(&input.order_id)
                .await?
                .is_some()
        {
            return Err(ValidationError::field("order_id", "already exists").into());
        }

        self.ctx
            .check_status("payout_status", sale.payout_status, input.payout_status)?;
        let item = self.linked_item(input.inventory_sku.as_deref()).await?;
        let new_link = item.as_ref().map(|item| item.id);
        if let Some(previous) = sale.inventory_id.filter(|id| new_link != Some(*id)) {
            warn!(
                sale_id = %sale.id,
                previous_item = %previous,
                new_item = ?new_link,
                "Sale moved off its linked item, which stays Sold"
            );
        }

        sale.platform = input.platform;
        sale.payout_status = input.payout_status;
        self.fill(&mut sale, input, item.as_ref())?;
        sale.updated_at = Utc::now();

        let item = item.map(|item| self.mark_sold(item, &sale)).transpose()?;
        self.ctx.store.update_sale(&sale).await.or_not_found(ENTITY, id)?;
        if let Some(mut item) = item {
            self.ctx.inventory().save(&mut item).await?;
        }

        info!(id = %sale.id, net_profit = %sale.net_profit, "Updated sale");
        Ok(sale)
    }

    /// Delete a sale along with its shipments. Returns that pointed at it
    /// are unlinked.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such sale.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: SaleId) -> Result<DeleteReport, ServiceError> {
        let report = self.ctx.store.delete_sale(id).await.or_not_found(ENTITY, id)?;
        info!(
            id = %id,
            cascaded = report.cascaded,
            detached = report.detached,
            "Deleted sale"
        );
        Ok(report)
    }

    /// Filtered page of sales with revenue and profit totals over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list(
        &self,
        filter: &SaleFilter,
        page: Page,
    ) -> Result<(Vec<Sale>, SalesTotals), ServiceError> {
        let sales = self.ctx.store.list_sales(filter, page).await?;
        let totals = SalesTotals::of(&sales);
        Ok((sales, totals))
    }

    async fn linked_item(&self, sku: Option<&str>) -> Result<Option<InventoryItem>, ServiceError> {
        let Some(sku) = sku else {
            return Ok(None);
        };
        self.ctx
            .store
            .get_inventory_by_sku(sku)
            .await?
            .map(Some)
            .ok_or_else(|| ServiceError::not_found("inventory item", sku))
    }

    /// Copy input amounts onto `sale`, fill in defaults and recompute.
    fn fill(
        &self,
        sale: &mut Sale,
        input: SaleInput,
        item: Option<&InventoryItem>,
    ) -> Result<(), ServiceError> {
        let settings = self.ctx.settings;
        sale.order_id = input.order_id;
        sale.inventory_id = item.map(|item| item.id);
        sale.item_name = input
            .item_name
            .or_else(|| item.map(|item| item.item_name.clone()));
        sale.sale_price = input.sale_price;
        sale.platform_fees = match input.platform_fees {
            Some(fees) => fees,
            None => percentage_of(
                input.sale_price,
                settings.platform_fee_percent(input.platform),
            )?,
        };
        sale.payment_processing_fees = input.payment_processing_fees.unwrap_or_default();
        sale.shipping_cost = input.shipping_cost;
        sale.buyer_paid_shipping = input.buyer_paid_shipping;
        sale.date_sold = input.date_sold.unwrap_or(self.ctx.today);
        sale.shipped_date = input.shipped_date;
        sale.tracking_number = input.tracking_number;
        sale.buyer_name = input.buyer_name;
        sale.buyer_username = input.buyer_username;
        sale.notes = input.notes;
        sale.recompute()?;
        Ok(())
    }

    /// Move the linked item to Sold and copy the sale's price and date.
    fn mark_sold(&self, mut item: InventoryItem, sale: &Sale) -> Result<InventoryItem, ServiceError> {
        self.ctx
            .check_status("listing_status", item.listing_status, ListingStatus::Sold)?;
        item.listing_status = ListingStatus::Sold;
        item.sale_price = Some(sale.sale_price);
        item.date_sold.get_or_insert(sale.date_sold);
        Ok(item)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use flipledger_core::{ComputationError, PayoutStatus, Platform};

    use super::*;
    use crate::db::Store;
    use crate::models::{AppSettings, InventoryInput};
    use crate::services::test_support::{store, strict, today};

    fn input(order_id: &str) -> SaleInput {
        SaleInput {
            order_id: order_id.to_owned(),
            platform: Platform::Ebay,
            sale_price: dec!(30.00),
            platform_fees: Some(dec!(3.00)),
            payment_processing_fees: Some(dec!(1.00)),
            shipping_cost: dec!(4.00),
            buyer_paid_shipping: false,
            ..SaleInput::default()
        }
    }

    #[tokio::test]
    async fn test_record_computes_net_profit() {
        let store = store();
        let settings = AppSettings::default();
        let sales = ServiceContext::new(&store, &settings, today()).sales();

        let sale = sales.record(input("E-1")).await.unwrap();
        assert_eq!(sale.net_profit, dec!(22.00));
        assert_eq!(sale.date_sold, today());
    }

    #[tokio::test]
    async fn test_omitted_fees_use_settings() {
        let store = store();
        let settings = AppSettings::default();
        let sales = ServiceContext::new(&store, &settings, today()).sales();

        let sale = sales
            .record(SaleInput {
                platform_fees: None,
                payment_processing_fees: None,
                buyer_paid_shipping: true,
                ..input("E-2")
            })
            .await
            .unwrap();
        // 12.8% of 30.00
        assert_eq!(sale.platform_fees, dec!(3.84));
        assert_eq!(sale.payment_processing_fees, Decimal::ZERO);
        assert_eq!(sale.net_profit, dec!(26.16));
    }

    #[tokio::test]
    async fn test_unknown_sku_is_not_found() {
        let store = store();
        let settings = AppSettings::default();
        let sales = ServiceContext::new(&store, &settings, today()).sales();

        let err = sales
            .record(SaleInput {
                inventory_sku: Some("NOPE".to_owned()),
                ..input("E-3")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(e) if e.key == "NOPE"));
    }

    #[tokio::test]
    async fn test_linked_item_is_marked_sold() {
        let store = store();
        let settings = AppSettings::default();
        let ctx = ServiceContext::new(&store, &settings, today());
        let item = ctx
            .inventory()
            .create(InventoryInput {
                sku: "SKU1".to_owned(),
                item_name: "Jacket".to_owned(),
                listing_status: ListingStatus::Listed,
                purchase_price: dec!(10.00),
                ..InventoryInput::default()
            })
            .await
            .unwrap();

        let sale = ctx
            .sales()
            .record(SaleInput {
                inventory_sku: Some("sku1".to_owned()),
                ..input("E-4")
            })
            .await
            .unwrap();
        assert_eq!(sale.inventory_id, Some(item.id));
        assert_eq!(sale.item_name.as_deref(), Some("Jacket"));

        let item = ctx.inventory().get(item.id).await.unwrap();
        assert_eq!(item.listing_status, ListingStatus::Sold);
        assert_eq!(item.sale_price, Some(dec!(30.00)));
        assert_eq!(item.date_sold, Some(today()));
        assert_eq!(item.profit, Some(dec!(20.00)));
    }

    #[tokio::test]
    async fn test_strict_policy_blocks_selling_archived_item() {
        let store = store();
        let settings = strict();
        let ctx = ServiceContext::new(&store, &settings, today());
        ctx.inventory()
            .create(InventoryInput {
                sku: "OLD".to_owned(),
                item_name: "Boots".to_owned(),
                listing_status: ListingStatus::Archived,
                ..InventoryInput::default()
            })
            .await
            .unwrap();

        let err = ctx
            .sales()
            .record(SaleInput {
                inventory_sku: Some("OLD".to_owned()),
                ..input("E-5")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(store.get_sale_by_order_id("E-5").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_order_id_rejected() {
        let store = store();
        let settings = AppSettings::default();
        let sales = ServiceContext::new(&store, &settings, today()).sales();
        sales.record(input("E-6")).await.unwrap();
        let err = sales.record(input("E-6")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(e) if e.message_for("order_id").is_some()));
    }

    #[tokio::test]
    async fn test_update_recomputes_and_checks_payout() {
        let store = store();
        let settings = strict();
        let sales = ServiceContext::new(&store, &settings, today()).sales();
        let sale = sales.record(input("E-7")).await.unwrap();

        let updated = sales
            .update(
                sale.id,
                SaleInput {
                    shipping_cost: dec!(0),
                    payout_status: PayoutStatus::Processing,
                    ..input("E-7")
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.net_profit, dec!(26.00));

        let err = sales
            .update(
                sale.id,
                SaleInput {
                    payout_status: PayoutStatus::Pending,
                    ..input("E-7")
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(e) if e.message_for("payout_status").is_some()));
    }

    #[tokio::test]
    async fn test_relinking_leaves_previous_item_sold() {
        let store = store();
        let settings = AppSettings::default();
        let ctx = ServiceContext::new(&store, &settings, today());
        for sku in ["OLD", "NEW"] {
            ctx.inventory()
                .create(InventoryInput {
                    sku: sku.to_owned(),
                    item_name: "Coat".to_owned(),
                    listing_status: ListingStatus::Listed,
                    ..InventoryInput::default()
                })
                .await
                .unwrap();
        }
        let sale = ctx
            .sales()
            .record(SaleInput {
                inventory_sku: Some("OLD".to_owned()),
                ..input("E-8")
            })
            .await
            .unwrap();

        let updated = ctx
            .sales()
            .update(
                sale.id,
                SaleInput {
                    inventory_sku: Some("NEW".to_owned()),
                    sale_price: dec!(40.00),
                    ..input("E-8")
                },
            )
            .await
            .unwrap();

        let old = store.get_inventory_by_sku("OLD").await.unwrap().unwrap();
        let new = store.get_inventory_by_sku("NEW").await.unwrap().unwrap();
        assert_eq!(updated.inventory_id, Some(new.id));
        assert_eq!(new.listing_status, ListingStatus::Sold);
        assert_eq!(new.sale_price, Some(dec!(40.00)));
        assert_eq!(old.listing_status, ListingStatus::Sold);
        assert_eq!(old.sale_price, Some(dec!(30.00)));
    }

    #[tokio::test]
    async fn test_fee_overflow_is_a_computation_error() {
        let store = store();
        let settings = AppSettings::default();
        let sales = ServiceContext::new(&store, &settings, today()).sales();

        let err = sales
            .record(SaleInput {
                sale_price: Decimal::MAX,
                platform_fees: None,
                ..input("E-9")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Computation(ComputationError::Overflow)));
        assert!(store.get_sale_by_order_id("E-9").await.unwrap().is_none());
    }
}
