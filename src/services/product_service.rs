//! Product service

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::bounded;
use crate::domain::{DomainError, Page, Product, ProductDraft};
use crate::error::AppResult;
use crate::store::ProductStore;

use super::commands::PageQuery;

#[derive(Clone)]
pub struct ProductService {
    products: Arc<dyn ProductStore>,
    timeout: Duration,
}

impl ProductService {
    pub fn new(products: Arc<dyn ProductStore>, timeout: Duration) -> Self {
        Self { products, timeout }
    }

    pub async fn create(&self, draft: ProductDraft) -> AppResult<Product> {
        draft.validate()?;

        let product = draft.into_product();
        let product = bounded(self.timeout, self.products.create(&product)).await??;

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        bounded(self.timeout, self.products.find_by_id(id))
            .await??
            .ok_or_else(|| DomainError::not_found("Product", id).into())
    }

    /// Replace price, stock, description and tags of a product
    pub async fn update(&self, id: Uuid, draft: ProductDraft) -> AppResult<Product> {
        draft.validate()?;

        let product = draft.into_product_with_id(id);
        let product = bounded(self.timeout, self.products.update(&product)).await??;

        tracing::info!(product_id = %id, "product updated");
        Ok(product)
    }

    pub async fn list(&self, query: PageQuery) -> AppResult<Vec<Product>> {
        let page = Page::new(query.limit, query.offset)?;
        if page.is_empty() {
            return Ok(Vec::new());
        }
        Ok(bounded(self.timeout, self.products.list(page)).await??)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::store::MemoryStore;

    fn service() -> ProductService {
        ProductService::new(Arc::new(MemoryStore::new()), Duration::from_secs(5))
    }

    fn draft(price: i64, quantity: i64) -> ProductDraft {
        ProductDraft {
            price,
            quantity,
            description: "lamp".to_string(),
            tags: vec!["home".to_string(), "light".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_get_update() {
        let service = service();
        let created = service.create(draft(1999, 4)).await.unwrap();
        assert_eq!(service.get(created.id).await.unwrap(), created);

        let updated = service.update(created.id, draft(1499, 9)).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.price, 1499);
        assert_eq!(updated.quantity, 9);
    }

    #[tokio::test]
    async fn test_negative_values_rejected() {
        let service = service();
        assert!(matches!(
            service.create(draft(-1, 1)).await,
            Err(AppError::Domain(DomainError::Validation(_)))
        ));

        let created = service.create(draft(1, 1)).await.unwrap();
        assert!(matches!(
            service.update(created.id, draft(1, -3)).await,
            Err(AppError::Domain(DomainError::Validation(_)))
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_values_rejected() {
        use crate::domain::{MAX_PRICE, MAX_QUANTITY};

        let service = service();
        assert!(matches!(
            service.create(draft(MAX_PRICE + 1, 1)).await,
            Err(AppError::Domain(DomainError::Validation(_)))
        ));
        assert!(matches!(
            service.create(draft(1, MAX_QUANTITY + 1)).await,
            Err(AppError::Domain(DomainError::Validation(_)))
        ));
        assert!(service.create(draft(MAX_PRICE, MAX_QUANTITY)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let service = service();
        assert!(matches!(
            service.get(Uuid::new_v4()).await,
            Err(AppError::Domain(DomainError::NotFound { .. }))
        ));
        assert!(matches!(
            service.update(Uuid::new_v4(), draft(1, 1)).await,
            Err(AppError::Domain(DomainError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_list_pages() {
        let service = service();
        for price in 0..5 {
            service.create(draft(price, 1)).await.unwrap();
        }

        let query = PageQuery {
            limit: Some(2),
            offset: Some(4),
        };
        assert_eq!(service.list(query).await.unwrap().len(), 1);
        assert_eq!(service.list(PageQuery::default()).await.unwrap().len(), 5);
    }
}
