//! Product catalog.

use crate::resource::{Resource, ResourceId};
use serde_json::{json, Value};
use session_auth::{ApiClient, ApiResult, Method};

const PRODUCTS: &str = "/api/products/products/";
const PRODUCT_INGREDIENTS: &str = "/api/products/product-ingredients/";

pub struct ProductsApi<'a> {
    client: &'a ApiClient,
    products: Resource<'a>,
}

impl<'a> ProductsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self {
            client,
            products: Resource::new(client, PRODUCTS),
        }
    }

    pub async fn list(&self) -> ApiResult<Value> {
        self.products.list().await
    }

    pub async fn get(&self, id: ResourceId) -> ApiResult<Value> {
        self.products.get(id).await
    }

    pub async fn create(&self, data: Value) -> ApiResult<Value> {
        self.products.create(data).await
    }

    pub async fn update(&self, id: ResourceId, data: Value) -> ApiResult<Value> {
        self.products.update(id, data).await
    }

    pub async fn delete(&self, id: ResourceId) -> ApiResult<()> {
        self.products.delete(id).await
    }

    /// Replace the recipe of a product. `ingredients` is the backend's list of
    /// `{ingredient, quantity}` entries.
    pub async fn set_ingredients(
        &self,
        product_id: ResourceId,
        ingredients: Value,
    ) -> ApiResult<Value> {
        let path = format!("{PRODUCT_INGREDIENTS}{product_id}/");
        let body = json!({ "ingredients": ingredients });
        self.client
            .request_json(&path, Method::Post, Some(body))
            .await
    }
}
