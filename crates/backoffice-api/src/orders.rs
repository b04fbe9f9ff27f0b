//! Orders and their line items.

use crate::resource::{Resource, ResourceId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use session_auth::{ApiClient, ApiResult, Method};
use std::fmt;
use tracing::info;

const ORDERS: &str = "/api/orders/orders/";
const ORDER_ITEMS: &str = "/api/orders/order-items/";

/// Order lifecycle states accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct OrdersApi<'a> {
    client: &'a ApiClient,
    orders: Resource<'a>,
    items: Resource<'a>,
}

impl<'a> OrdersApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self {
            client,
            orders: Resource::new(client, ORDERS),
            items: Resource::new(client, ORDER_ITEMS),
        }
    }

    pub async fn list(&self) -> ApiResult<Value> {
        self.orders.list().await
    }

    pub async fn get(&self, id: ResourceId) -> ApiResult<Value> {
        self.orders.get(id).await
    }

    pub async fn create(&self, data: Value) -> ApiResult<Value> {
        self.orders.create(data).await
    }

    pub async fn update(&self, id: ResourceId, data: Value) -> ApiResult<Value> {
        self.orders.update(id, data).await
    }

    pub async fn delete(&self, id: ResourceId) -> ApiResult<()> {
        self.orders.delete(id).await
    }

    /// Move an order to `status`. The backend records the change in the
    /// order's status history.
    pub async fn update_status(&self, id: ResourceId, status: OrderStatus) -> ApiResult<Value> {
        let path = format!("{}update_status/", self.orders.item_path(id));
        let order = self
            .client
            .request_json(&path, Method::Patch, Some(json!({ "status": status })))
            .await?;
        info!(order_id = id, %status, "Order status updated");
        Ok(order)
    }

    /// Line items of one order.
    pub async fn items(&self, order_id: ResourceId) -> ApiResult<Value> {
        let order_id = order_id.to_string();
        self.items
            .list_filtered(&[("order_id", order_id.as_str())])
            .await
    }
}
