//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::TokenPair;
use crate::domain::{Order, OrderLine, Product, ProductDraft, RequestContext, User};
use crate::error::AppError;
use crate::inventory::OrderDetails;
use crate::services::{
    AddProductCommand, AppState, LoginCommand, PageQuery, RefreshCommand, SignupCommand,
    UpdateProfileCommand,
};

use super::middleware::auth_middleware;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
pub struct DeleteProductQuery {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeleteProductResponse {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub removed_lines: u64,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/signup", post(signup))
        .route("/auth", post(login).put(refresh).delete(logout))
        .route("/products", get(list_products))
        .route("/products/:product_id", get(get_product));

    let protected = Router::new()
        .route(
            "/profile",
            get(get_profile).patch(update_profile).delete(delete_profile),
        )
        .route("/products", post(create_product))
        .route("/products/:product_id", put(update_product))
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:order_id", get(get_order))
        .route("/orders/complete/:order_id", post(complete_order))
        .route(
            "/orders/content/:order_id",
            post(add_product_to_order).delete(delete_product_from_order),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

// =========================================================================
// Auth
// =========================================================================

/// POST /signup
async fn signup(
    State(state): State<AppState>,
    Json(command): Json<SignupCommand>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let (user, tokens) = state.users.signup(command).await?;
    Ok((StatusCode::CREATED, Json(SignupResponse { user, tokens })))
}

/// POST /auth
async fn login(
    State(state): State<AppState>,
    Json(command): Json<LoginCommand>,
) -> Result<Json<TokenPair>, AppError> {
    Ok(Json(state.users.login(command).await?))
}

/// PUT /auth
async fn refresh(
    State(state): State<AppState>,
    Json(command): Json<RefreshCommand>,
) -> Result<Json<TokenPair>, AppError> {
    Ok(Json(state.users.refresh(command).await?))
}

/// DELETE /auth
async fn logout(
    State(state): State<AppState>,
    Json(command): Json<RefreshCommand>,
) -> Result<StatusCode, AppError> {
    state.users.logout(command).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Profile
// =========================================================================

/// GET /profile
async fn get_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.profile(ctx.user_id).await?))
}

/// PATCH /profile
async fn update_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(command): Json<UpdateProfileCommand>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.update_profile(ctx.user_id, command).await?))
}

/// DELETE /profile
async fn delete_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<StatusCode, AppError> {
    state.users.delete_profile(ctx.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Products
// =========================================================================

/// POST /products
async fn create_product(
    State(state): State<AppState>,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = state.products.create(draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/:product_id
async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.products.update(product_id, draft).await?))
}

/// GET /products/:product_id
async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.products.get(product_id).await?))
}

/// GET /products?limit=&offset=
async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.products.list(query).await?))
}

// =========================================================================
// Orders
// =========================================================================

/// POST /orders
async fn create_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = state.orders.create(&ctx).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders?limit=&offset=
async fn list_orders(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.orders.list(&ctx, query).await?))
}

/// GET /orders/:order_id
async fn get_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderDetails>, AppError> {
    Ok(Json(state.orders.get(&ctx, order_id).await?))
}

/// POST /orders/complete/:order_id
async fn complete_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.orders.complete(&ctx, order_id).await?))
}

/// POST /orders/content/:order_id
async fn add_product_to_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(order_id): Path<Uuid>,
    Json(command): Json<AddProductCommand>,
) -> Result<(StatusCode, Json<OrderLine>), AppError> {
    let line = state.orders.add_product(&ctx, order_id, command).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

/// DELETE /orders/content/:order_id?product_id=
async fn delete_product_from_order(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(order_id): Path<Uuid>,
    Query(query): Query<DeleteProductQuery>,
) -> Result<Json<DeleteProductResponse>, AppError> {
    let removed_lines = state
        .orders
        .delete_product(&ctx, order_id, query.product_id)
        .await?;

    Ok(Json(DeleteProductResponse {
        order_id,
        product_id: query.product_id,
        removed_lines,
    }))
}
