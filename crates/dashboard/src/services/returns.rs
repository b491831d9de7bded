//! Return case service.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use flipledger_core::{DeleteReport, ReturnCaseId, SaleId};

use super::error::NotFoundExt;
use super::{ServiceContext, ServiceError};
use crate::models::{Page, ReturnCase, ReturnFilter, ReturnInput};

const ENTITY: &str = "return";

/// Return case operations.
pub struct ReturnService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> ReturnService<'a> {
    #[must_use]
    pub const fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    /// Open a return. It is linked to the sale carrying the same order id,
    /// when one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn open(&self, input: ReturnInput) -> Result<ReturnCase, ServiceError> {
        let now = Utc::now();
        let mut case = ReturnCase {
            id: ReturnCaseId::generate(),
            sale_id: None,
            order_id: String::new(),
            reason: None,
            status: input.status,
            date_opened: self.ctx.today,
            date_closed: None,
            expected_loss: Decimal::ZERO,
            actual_loss: None,
            resolution_notes: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        case.apply(input, self.ctx.today);
        case.sale_id = self.sale_for(&case.order_id).await?;
        case.stamp_status_date(self.ctx.today);
        self.ctx.store.insert_return(&case).await?;

        info!(id = %case.id, linked = case.sale_id.is_some(), "Opened return");
        Ok(case)
    }

    /// Fetch one return.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such return.
    pub async fn get(&self, id: ReturnCaseId) -> Result<ReturnCase, ServiceError> {
        self.ctx
            .store
            .get_return(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))
    }

    /// Replace the editable fields and re-link the sale by order id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing return, or a validation error for a
    /// refused status change.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: ReturnCaseId,
        input: ReturnInput,
    ) -> Result<ReturnCase, ServiceError> {
        let mut case = self.get(id).await?;
        let transition = self.ctx.check_status("status", case.status, input.status)?;

        case.apply(input, self.ctx.today);
        if transition.changed() {
            case.stamp_status_date(self.ctx.today);
        }
        case.sale_id = self.sale_for(&case.order_id).await?;
        case.updated_at = Utc::now();
        self.ctx
            .store
            .update_return(&case)
            .await
            .or_not_found(ENTITY, id)?;

        info!(id = %case.id, status = %case.status, "Updated return");
        Ok(case)
    }

    /// Delete a return.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such return.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ReturnCaseId) -> Result<DeleteReport, ServiceError> {
        let report = self
            .ctx
            .store
            .delete_return(id)
            .await
            .or_not_found(ENTITY, id)?;
        info!(id = %id, "Deleted return");
        Ok(report)
    }

    /// Filtered page of returns, most recently opened first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list(
        &self,
        filter: &ReturnFilter,
        page: Page,
    ) -> Result<Vec<ReturnCase>, ServiceError> {
        Ok(self.ctx.store.list_returns(filter, page).await?)
    }

    async fn sale_for(&self, order_id: &str) -> Result<Option<SaleId>, ServiceError> {
        Ok(self
            .ctx
            .store
            .get_sale_by_order_id(order_id)
            .await?
            .map(|sale| sale.id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use flipledger_core::ReturnStatus;

    use super::*;
    use crate::models::{AppSettings, SaleInput};
    use crate::services::test_support::{store, strict, today};

    fn input(order_id: &str) -> ReturnInput {
        ReturnInput {
            order_id: order_id.to_owned(),
            reason: Some("Not as described".to_owned()),
            expected_loss: dec!(5.00),
            ..ReturnInput::default()
        }
    }

    #[tokio::test]
    async fn test_open_links_sale_by_order_id() {
        let store = store();
        let settings = AppSettings::default();
        let ctx = ServiceContext::new(&store, &settings, today());
        let sale = ctx
            .sales()
            .record(SaleInput {
                order_id: "V-9".to_owned(),
                sale_price: dec!(12.00),
                ..SaleInput::default()
            })
            .await
            .unwrap();

        let case = ctx.returns().open(input("V-9")).await.unwrap();
        assert_eq!(case.sale_id, Some(sale.id));
        assert_eq!(case.date_opened, today());
        assert_eq!(case.status, ReturnStatus::Opened);
    }

    #[tokio::test]
    async fn test_open_without_matching_sale_stays_unlinked() {
        let store = store();
        let settings = AppSettings::default();
        let ctx = ServiceContext::new(&store, &settings, today());
        let case = ctx.returns().open(input("UNKNOWN")).await.unwrap();
        assert_eq!(case.sale_id, None);
    }

    #[tokio::test]
    async fn test_resolving_stamps_close_date() {
        let store = store();
        let settings = strict();
        let ctx = ServiceContext::new(&store, &settings, today());
        let case = ctx.returns().open(input("V-1")).await.unwrap();

        let closed = ctx
            .returns()
            .update(
                case.id,
                ReturnInput {
                    status: ReturnStatus::Resolved,
                    actual_loss: Some(dec!(3.50)),
                    ..input("V-1")
                },
            )
            .await
            .unwrap();
        assert_eq!(closed.date_closed, Some(today()));
        assert!(!closed.status.is_open());

        let err = ctx.returns().update(case.id, input("V-1")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deleting_sale_unlinks_return() {
        let store = store();
        let settings = AppSettings::default();
        let ctx = ServiceContext::new(&store, &settings, today());
        let sale = ctx
            .sales()
            .record(SaleInput {
                order_id: "V-2".to_owned(),
                ..SaleInput::default()
            })
            .await
            .unwrap();
        let case = ctx.returns().open(input("V-2")).await.unwrap();

        ctx.sales().delete(sale.id).await.unwrap();
        let case = ctx.returns().get(case.id).await.unwrap();
        assert_eq!(case.sale_id, None);
        assert_eq!(case.order_id, "V-2");
    }
}
