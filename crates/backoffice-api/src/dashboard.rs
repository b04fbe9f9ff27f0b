//! Dashboard analytics endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use session_auth::{ApiClient, ApiRequest, ApiResult};
use std::fmt;

/// Default row count for the recent-orders and popular-products widgets.
pub const DEFAULT_LIST_LIMIT: u32 = 5;

const STATS: &str = "/api/dashboard/stats/";
const SALES_CHART: &str = "/api/dashboard/sales-chart/";
const RECENT_ORDERS: &str = "/api/dashboard/recent-orders/";
const ORDER_STATUS_CHART: &str = "/api/dashboard/order-status-chart/";
const POPULAR_PRODUCTS: &str = "/api/dashboard/popular-products/";
const INVENTORY_STATUS: &str = "/api/dashboard/inventory-status/";

/// Sales chart bucket size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartRange {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl ChartRange {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartRange::Daily => "daily",
            ChartRange::Weekly => "weekly",
            ChartRange::Monthly => "monthly",
        }
    }
}

impl fmt::Display for ChartRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look-back window for popular products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    #[default]
    Month,
    Year,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct DashboardApi<'a> {
    client: &'a ApiClient,
}

impl<'a> DashboardApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Headline counters (sales, orders, stock alerts).
    pub async fn stats(&self) -> ApiResult<Value> {
        self.client.send_json(ApiRequest::get(STATS)).await
    }

    pub async fn sales_chart(&self, range: ChartRange) -> ApiResult<Value> {
        self.client
            .send_json(ApiRequest::get(SALES_CHART).with_query("type", range))
            .await
    }

    pub async fn recent_orders(&self, limit: u32) -> ApiResult<Value> {
        self.client
            .send_json(ApiRequest::get(RECENT_ORDERS).with_query("limit", limit))
            .await
    }

    pub async fn popular_products(&self, limit: u32, period: Period) -> ApiResult<Value> {
        self.client
            .send_json(
                ApiRequest::get(POPULAR_PRODUCTS)
                    .with_query("limit", limit)
                    .with_query("period", period),
            )
            .await
    }

    pub async fn order_status_chart(&self) -> ApiResult<Value> {
        self.client
            .send_json(ApiRequest::get(ORDER_STATUS_CHART))
            .await
    }

    /// Low-stock ingredients. `None` lets the backend return all of them.
    pub async fn inventory_status(&self, limit: Option<u32>) -> ApiResult<Value> {
        let request = match limit {
            Some(limit) => ApiRequest::get(INVENTORY_STATUS).with_query("limit", limit),
            None => ApiRequest::get(INVENTORY_STATUS),
        };
        self.client.send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use session_auth::testing::MockBackend;
    use session_auth::{ClientOptions, Method, StatusCode};

    fn query(backend: &MockBackend, index: usize) -> Vec<(String, String)> {
        backend.calls()[index].query().to_vec()
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ChartRange::default().as_str(), "daily");
        assert_eq!(Period::default().as_str(), "month");
        assert_eq!(serde_json::to_value(Period::Year).unwrap(), json!("year"));
    }

    #[tokio::test]
    async fn test_dashboard_queries() {
        let backend = MockBackend::new();
        backend
            .respond(Method::Get, SALES_CHART, StatusCode::OK, json!({"labels": []}))
            .respond(Method::Get, RECENT_ORDERS, StatusCode::OK, json!([]))
            .respond(Method::Get, POPULAR_PRODUCTS, StatusCode::OK, json!([]))
            .respond(Method::Get, INVENTORY_STATUS, StatusCode::OK, json!([]))
            .respond(Method::Get, INVENTORY_STATUS, StatusCode::OK, json!([]));
        let client = ApiClient::new(backend.clone(), ClientOptions::default());
        let dashboard = DashboardApi::new(&client);

        dashboard.sales_chart(ChartRange::Weekly).await.unwrap();
        dashboard.recent_orders(DEFAULT_LIST_LIMIT).await.unwrap();
        dashboard
            .popular_products(10, Period::default())
            .await
            .unwrap();
        dashboard.inventory_status(Some(3)).await.unwrap();
        dashboard.inventory_status(None).await.unwrap();

        assert_eq!(query(&backend, 0), vec![pair("type", "weekly")]);
        assert_eq!(query(&backend, 1), vec![pair("limit", "5")]);
        assert_eq!(
            query(&backend, 2),
            vec![pair("limit", "10"), pair("period", "month")]
        );
        assert_eq!(query(&backend, 3), vec![pair("limit", "3")]);
        assert!(query(&backend, 4).is_empty());
    }

    #[tokio::test]
    async fn test_stats_and_status_chart() {
        let backend = MockBackend::new();
        backend
            .respond(
                Method::Get,
                STATS,
                StatusCode::OK,
                json!({"total_sales": "120.50", "total_orders": 14}),
            )
            .respond(
                Method::Get,
                ORDER_STATUS_CHART,
                StatusCode::OK,
                json!([{"status": "pending", "count": 2}]),
            );
        let client = ApiClient::new(backend.clone(), ClientOptions::default());
        let dashboard = DashboardApi::new(&client);

        assert_eq!(dashboard.stats().await.unwrap()["total_orders"], 14);
        assert_eq!(
            dashboard.order_status_chart().await.unwrap()[0]["status"],
            "pending"
        );
    }
}
