//! Typed wrappers for the back-office REST endpoints.
//!
//! Every call goes through [`ApiClient`], so all of them inherit cookie
//! credentials and refresh-and-retry. Payloads are backend contracts and are
//! returned as opaque JSON.
//!
//! ```rust,ignore
//! let office = BackOffice::new(ApiClient::from_config(&config)?);
//! let stats = office.dashboard().stats().await?;
//! ```

mod cart;
mod customers;
mod dashboard;
mod ingredients;
mod orders;
mod products;
mod resource;

pub use cart::{Cart, CartItem};
pub use customers::CustomersApi;
pub use dashboard::{ChartRange, DashboardApi, Period, DEFAULT_LIST_LIMIT};
pub use ingredients::IngredientsApi;
pub use orders::{OrderStatus, OrdersApi};
pub use products::ProductsApi;
pub use resource::{Resource, ResourceId};

use session_auth::ApiClient;

/// Entry point bundling every endpoint group over one client.
#[derive(Clone)]
pub struct BackOffice {
    client: ApiClient,
}

impl BackOffice {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn dashboard(&self) -> DashboardApi<'_> {
        DashboardApi::new(&self.client)
    }

    pub fn ingredients(&self) -> IngredientsApi<'_> {
        IngredientsApi::new(&self.client)
    }

    pub fn products(&self) -> ProductsApi<'_> {
        ProductsApi::new(&self.client)
    }

    pub fn orders(&self) -> OrdersApi<'_> {
        OrdersApi::new(&self.client)
    }

    pub fn customers(&self) -> CustomersApi<'_> {
        CustomersApi::new(&self.client)
    }
}
