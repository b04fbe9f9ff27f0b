//! Customer directory (read-only).

use crate::resource::{Resource, ResourceId};
use serde_json::Value;
use session_auth::{ApiClient, ApiResult};

const CUSTOMERS: &str = "/customers/";

pub struct CustomersApi<'a> {
    customers: Resource<'a>,
}

impl<'a> CustomersApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self {
            customers: Resource::new(client, CUSTOMERS),
        }
    }

    pub async fn list(&self) -> ApiResult<Value> {
        self.customers.list().await
    }

    pub async fn get(&self, id: ResourceId) -> ApiResult<Value> {
        self.customers.get(id).await
    }
}
