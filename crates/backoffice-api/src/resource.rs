//! Generic CRUD over one backend collection.

use serde_json::Value;
use session_auth::{ApiClient, ApiRequest, ApiResult, Method};
use std::fmt;
use tracing::debug;

/// Backend primary key.
pub type ResourceId = i64;

/// A REST collection such as `/api/products/products/`.
///
/// Items live at `{collection}{id}/`; the backend requires the trailing slash.
#[derive(Clone, Copy)]
pub struct Resource<'a> {
    client: &'a ApiClient,
    collection: &'static str,
}

impl fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("collection", &self.collection)
            .finish()
    }
}

impl<'a> Resource<'a> {
    pub fn new(client: &'a ApiClient, collection: &'static str) -> Self {
        Self { client, collection }
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    pub fn item_path(&self, id: ResourceId) -> String {
        format!("{}{id}/", self.collection)
    }

    pub async fn list(&self) -> ApiResult<Value> {
        self.client
            .request_json(self.collection, Method::Get, None)
            .await
    }

    /// List with query filters, e.g. `[("order_id", "12")]`.
    pub async fn list_filtered(&self, filters: &[(&str, &str)]) -> ApiResult<Value> {
        let request = filters
            .iter()
            .fold(ApiRequest::get(self.collection), |request, (key, value)| {
                request.with_query(*key, value)
            });
        self.client.send_json(request).await
    }

    pub async fn get(&self, id: ResourceId) -> ApiResult<Value> {
        self.client
            .request_json(&self.item_path(id), Method::Get, None)
            .await
    }

    pub async fn create(&self, data: Value) -> ApiResult<Value> {
        debug!(collection = self.collection, "Creating resource");
        self.client
            .request_json(self.collection, Method::Post, Some(data))
            .await
    }

    /// Full update (`put`).
    pub async fn update(&self, id: ResourceId, data: Value) -> ApiResult<Value> {
        self.client
            .request_json(&self.item_path(id), Method::Put, Some(data))
            .await
    }

    /// Partial update (`patch`).
    pub async fn patch(&self, id: ResourceId, data: Value) -> ApiResult<Value> {
        self.client
            .request_json(&self.item_path(id), Method::Patch, Some(data))
            .await
    }

    pub async fn delete(&self, id: ResourceId) -> ApiResult<()> {
        debug!(collection = self.collection, id, "Deleting resource");
        self.client
            .request(&self.item_path(id), Method::Delete, None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use session_auth::testing::{MockBackend, MockReply};
    use session_auth::{ApiError, ClientOptions, StatusCode};

    const PRODUCTS: &str = "/api/products/products/";

    #[tokio::test]
    async fn test_crud_paths_and_methods() {
        let backend = MockBackend::new();
        backend
            .respond(Method::Get, PRODUCTS, StatusCode::OK, json!([]))
            .respond(Method::Get, "/api/products/products/3/", StatusCode::OK, json!({"id": 3}))
            .respond(Method::Post, PRODUCTS, StatusCode::CREATED, json!({"id": 4}))
            .respond(Method::Put, "/api/products/products/4/", StatusCode::OK, json!({"id": 4}))
            .enqueue(
                Method::Delete,
                "/api/products/products/4/",
                MockReply::status(StatusCode::NO_CONTENT),
            );
        let client = ApiClient::new(backend.clone(), ClientOptions::default());
        let products = Resource::new(&client, PRODUCTS);

        assert_eq!(products.list().await.unwrap(), json!([]));
        assert_eq!(products.get(3).await.unwrap()["id"], 3);
        assert_eq!(
            products.create(json!({"name": "Flat white"})).await.unwrap()["id"],
            4
        );
        products.update(4, json!({"name": "Flat white"})).await.unwrap();
        products.delete(4).await.unwrap();

        let methods: Vec<_> = backend.calls().iter().map(|c| c.method()).collect();
        assert_eq!(
            methods,
            vec![
                Method::Get,
                Method::Get,
                Method::Post,
                Method::Put,
                Method::Delete
            ]
        );
    }

    #[tokio::test]
    async fn test_list_filtered_sends_query() {
        let backend = MockBackend::new();
        backend.respond(
            Method::Get,
            "/api/orders/order-items/",
            StatusCode::OK,
            json!([{"id": 1}]),
        );
        let client = ApiClient::new(backend.clone(), ClientOptions::default());

        Resource::new(&client, "/api/orders/order-items/")
            .list_filtered(&[("order_id", "12")])
            .await
            .unwrap();

        let call = &backend.calls()[0];
        assert_eq!(call.query(), &[("order_id".to_string(), "12".to_string())]);
    }

    #[tokio::test]
    async fn test_validation_error_passes_through() {
        let backend = MockBackend::new();
        backend.respond(
            Method::Post,
            PRODUCTS,
            StatusCode::BAD_REQUEST,
            json!({"price": ["A valid number is required."]}),
        );
        let client = ApiClient::new(backend.clone(), ClientOptions::default());

        let err = Resource::new(&client, PRODUCTS)
            .create(json!({"price": "abc"}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert!(matches!(err, ApiError::Status { .. }));
    }
}
