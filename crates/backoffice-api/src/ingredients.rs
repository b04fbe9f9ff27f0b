//! Ingredient inventory: categories and stock items.

use crate::resource::{Resource, ResourceId};
use serde_json::Value;
use session_auth::{ApiClient, ApiResult};

const CATEGORIES: &str = "/api/ingredients/categories/";
const INGREDIENTS: &str = "/api/ingredients/ingredients/";

pub struct IngredientsApi<'a> {
    categories: Resource<'a>,
    ingredients: Resource<'a>,
}

impl<'a> IngredientsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self {
            categories: Resource::new(client, CATEGORIES),
            ingredients: Resource::new(client, INGREDIENTS),
        }
    }

    pub async fn categories(&self) -> ApiResult<Value> {
        self.categories.list().await
    }

    pub async fn category(&self, id: ResourceId) -> ApiResult<Value> {
        self.categories.get(id).await
    }

    pub async fn create_category(&self, data: Value) -> ApiResult<Value> {
        self.categories.create(data).await
    }

    pub async fn update_category(&self, id: ResourceId, data: Value) -> ApiResult<Value> {
        self.categories.update(id, data).await
    }

    pub async fn delete_category(&self, id: ResourceId) -> ApiResult<()> {
        self.categories.delete(id).await
    }

    /// List ingredients; `filters` become query parameters.
    pub async fn ingredients(&self, filters: &[(&str, &str)]) -> ApiResult<Value> {
        if filters.is_empty() {
            self.ingredients.list().await
        } else {
            self.ingredients.list_filtered(filters).await
        }
    }

    pub async fn ingredient(&self, id: ResourceId) -> ApiResult<Value> {
        self.ingredients.get(id).await
    }

    pub async fn create_ingredient(&self, data: Value) -> ApiResult<Value> {
        self.ingredients.create(data).await
    }

    pub async fn update_ingredient(&self, id: ResourceId, data: Value) -> ApiResult<Value> {
        self.ingredients.update(id, data).await
    }

    pub async fn delete_ingredient(&self, id: ResourceId) -> ApiResult<()> {
        self.ingredients.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use session_auth::testing::{MockBackend, MockReply};
    use session_auth::{ClientOptions, Method, StatusCode};

    #[tokio::test]
    async fn test_category_and_ingredient_paths() {
        let backend = MockBackend::new();
        backend
            .respond(Method::Get, CATEGORIES, StatusCode::OK, json!([{"id": 1, "name": "Dairy"}]))
            .respond(Method::Put, "/api/ingredients/categories/1/", StatusCode::OK, json!({"id": 1}))
            .respond(Method::Get, INGREDIENTS, StatusCode::OK, json!([]))
            .respond(Method::Post, INGREDIENTS, StatusCode::CREATED, json!({"id": 8}))
            .enqueue(
                Method::Delete,
                "/api/ingredients/ingredients/8/",
                MockReply::status(StatusCode::NO_CONTENT),
            );
        let client = ApiClient::new(backend.clone(), ClientOptions::default());
        let api = IngredientsApi::new(&client);

        assert_eq!(api.categories().await.unwrap()[0]["name"], "Dairy");
        api.update_category(1, json!({"name": "Milk"})).await.unwrap();
        api.ingredients(&[("category", "1")]).await.unwrap();
        api.create_ingredient(json!({"name": "Oat milk", "quantity": "5.00", "unit": "l"}))
            .await
            .unwrap();
        api.delete_ingredient(8).await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls[2].query(), &[("category".to_string(), "1".to_string())]);
        assert_eq!(calls[4].path(), "/api/ingredients/ingredients/8/");
    }
}
