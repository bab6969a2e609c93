//! Order service
//!
//! Runs the inventory engine on behalf of an authenticated user. Every
//! persistence call is time-bounded and orders owned by someone else are
//! reported as missing.

use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::db::bounded;
use crate::domain::{DomainError, Order, OrderLine, Page, RequestContext};
use crate::error::AppResult;
use crate::inventory::{OrderDetails, OrderEngine};

use super::commands::{AddProductCommand, PageQuery};

#[derive(Clone)]
pub struct OrderService {
    engine: OrderEngine,
    timeout: Duration,
}

impl OrderService {
    pub fn new(engine: OrderEngine, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    pub async fn create(&self, ctx: &RequestContext) -> AppResult<Order> {
        Ok(bounded(self.timeout, self.engine.create_order(ctx.user_id)).await??)
    }

    pub async fn list(&self, ctx: &RequestContext, query: PageQuery) -> AppResult<Vec<Order>> {
        let page = Page::new(query.limit, query.offset)?;
        Ok(bounded(self.timeout, self.engine.list_orders_by_user(ctx.user_id, page)).await??)
    }

    pub async fn get(&self, ctx: &RequestContext, order_id: Uuid) -> AppResult<OrderDetails> {
        let details = bounded(self.timeout, self.engine.get_order(order_id)).await??;
        ensure_owner(ctx, &details.order)?;
        Ok(details)
    }

    pub async fn complete(&self, ctx: &RequestContext, order_id: Uuid) -> AppResult<Order> {
        self.owned(ctx, order_id).await?;
        Ok(bounded(self.timeout, self.engine.complete_order(order_id)).await??)
    }

    pub async fn add_product(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        command: AddProductCommand,
    ) -> AppResult<OrderLine> {
        command.validate()?;
        self.owned(ctx, order_id).await?;

        let line = bounded(
            self.timeout,
            self.engine
                .add_product_to_order(command.product_id, order_id, command.quantity),
        )
        .await??;

        tracing::debug!(
            correlation_id = %ctx.correlation_id,
            order_id = %order_id,
            "order line written"
        );
        Ok(line)
    }

    pub async fn delete_product(
        &self,
        ctx: &RequestContext,
        order_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<u64> {
        self.owned(ctx, order_id).await?;
        Ok(bounded(
            self.timeout,
            self.engine.delete_product_from_order(product_id, order_id),
        )
        .await??)
    }

    async fn owned(&self, ctx: &RequestContext, order_id: Uuid) -> AppResult<Order> {
        let order = bounded(self.timeout, self.engine.find_order(order_id)).await??;
        ensure_owner(ctx, &order)?;
        Ok(order)
    }
}

fn ensure_owner(ctx: &RequestContext, order: &Order) -> Result<(), DomainError> {
    if order.user_id != ctx.user_id {
        tracing::debug!(
            order_id = %order.id,
            user_id = %ctx.user_id,
            "order belongs to another user"
        );
        return Err(DomainError::not_found("Order", order.id));
    }
    Ok(())
}
