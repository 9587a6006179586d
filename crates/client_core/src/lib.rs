use async_trait::async_trait;
use shared::{domain::Customer, error::ApiError, protocol::CreateCustomerRequest};

pub mod cache;
pub mod controller;
pub mod http;
pub mod view;

pub use cache::{CollectionCache, CollectionState};
pub use controller::{
    CreationFlowController, DialogState, DraftCustomer, DraftField, SubmitError, UnknownFieldError,
    ValidationError,
};
pub use http::HttpCustomerApi;
pub use view::{CustomerRow, CustomersView, DialogView, Notice};

/// Endpoint path the customers view is bound to.
pub const CUSTOMERS_KEY: &str = "/api/customers";

/// Reads a whole collection identified by `key` (an endpoint path).
///
/// Every failure, including transport errors, is reported as an [`ApiError`]
/// so that callers can store it without further classification.
#[async_trait]
pub trait CollectionFetcher<T>: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Vec<T>, ApiError>;
}

/// Creates a customer in the collection identified by `key`.
#[async_trait]
pub trait CustomerCreator: Send + Sync {
    async fn create(&self, key: &str, request: &CreateCustomerRequest) -> Result<(), ApiError>;
}

pub type CustomerCache = CollectionCache<Customer>;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
