//! Client-side cart that turns into an order.
//!
//! The cart lives only in memory. [`Cart::create_order`] posts it through
//! [`OrdersApi`], so checkout inherits refresh-and-retry, and empties it on
//! success.

use crate::orders::OrdersApi;
use crate::resource::ResourceId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use session_auth::{ApiError, ApiResult};
use tracing::{debug, info};

/// One cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: ResourceId,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit of a product, merging with an existing line.
    pub fn add(&mut self, product: ResourceId, name: impl Into<String>, price: f64) {
        match self.items.iter_mut().find(|item| item.product == product) {
            Some(item) => item.quantity += 1,
            None => self.items.push(CartItem {
                product,
                name: name.into(),
                price,
                quantity: 1,
            }),
        }
        debug!(product, "Added to cart");
    }

    /// Set a line's quantity. Zero or less removes the line.
    pub fn update_quantity(&mut self, product: ResourceId, quantity: i64) {
        if quantity <= 0 {
            self.remove(product);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|item| item.product == product) {
            item.quantity = quantity;
        }
    }

    pub fn remove(&mut self, product: ResourceId) {
        self.items.retain(|item| item.product != product);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of price times quantity over every line.
    pub fn total_price(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.price * f64::from(item.quantity))
            .sum()
    }

    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// The order payload the backend expects.
    pub fn order_payload(&self) -> Value {
        let order_items: Vec<Value> = self
            .items
            .iter()
            .map(|item| {
                json!({
                    "product": item.product,
                    "quantity": item.quantity,
                    "price": item.price,
                })
            })
            .collect();
        json!({ "order_items": order_items })
    }

    /// Place an order for the cart's contents and empty it.
    ///
    /// The cart is left untouched when the call fails.
    pub async fn create_order(&mut self, orders: &OrdersApi<'_>) -> ApiResult<Value> {
        if self.is_empty() {
            return Err(ApiError::InvalidRequest("Cart is empty".to_string()));
        }

        let order = orders.create(self.order_payload()).await?;
        info!(
            lines = self.items.len(),
            units = self.total_items(),
            "Order created from cart"
        );
        self.clear();
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_auth::testing::MockBackend;
    use session_auth::{ApiClient, ClientOptions, Method, StatusCode};

    const ORDERS: &str = "/api/orders/orders/";

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add(1, "Espresso", 2.5);
        cart.add(2, "Croissant", 3.0);
        cart.add(1, "Espresso", 2.5);
        cart
    }

    #[test]
    fn test_add_merges_lines() {
        let cart = cart();
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.items()[1].quantity, 1);
    }

    #[test]
    fn test_update_quantity_zero_removes_line() {
        let mut cart = cart();

        cart.update_quantity(2, 4);
        assert_eq!(cart.items()[1].quantity, 4);

        cart.update_quantity(1, 0);
        assert_eq!(cart.items().len(), 1);
        cart.update_quantity(2, -1);
        assert!(cart.is_empty());

        cart.update_quantity(9, 3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals() {
        let mut cart = cart();
        assert_eq!(cart.total_items(), 3);
        assert!((cart.total_price() - 8.0).abs() < f64::EPSILON);

        cart.remove(1);
        assert_eq!(cart.total_items(), 1);
        cart.clear();
        assert_eq!(cart.total_price(), 0.0);
    }

    #[tokio::test]
    async fn test_create_order_posts_lines_and_clears() {
        let backend = MockBackend::new();
        backend.respond(Method::Post, ORDERS, StatusCode::CREATED, json!({"id": 42}));
        let client = ApiClient::new(backend.clone(), ClientOptions::default());
        let mut cart = cart();

        let order = cart.create_order(&OrdersApi::new(&client)).await.unwrap();

        assert_eq!(order["id"], 42);
        assert!(cart.is_empty());
        assert_eq!(
            backend.calls()[0].body(),
            Some(&json!({"order_items": [
                {"product": 1, "quantity": 2, "price": 2.5},
                {"product": 2, "quantity": 1, "price": 3.0},
            ]}))
        );
    }

    #[tokio::test]
    async fn test_failed_order_keeps_cart() {
        let backend = MockBackend::new();
        backend.respond(
            Method::Post,
            ORDERS,
            StatusCode::BAD_REQUEST,
            json!({"detail": "Out of stock"}),
        );
        let client = ApiClient::new(backend.clone(), ClientOptions::default());
        let mut cart = cart();

        let err = cart.create_order(&OrdersApi::new(&client)).await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(cart.total_items(), 3);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_locally() {
        let backend = MockBackend::new();
        let client = ApiClient::new(backend.clone(), ClientOptions::default());

        let err = Cart::new()
            .create_order(&OrdersApi::new(&client))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert!(backend.calls().is_empty());
    }
}
