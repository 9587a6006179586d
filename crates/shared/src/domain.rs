use serde::{Deserialize, Serialize};

/// A customer as returned by `GET /api/customers`.
///
/// `email` is the row key when the collection is rendered. Uniqueness is
/// the server's concern; the client never deduplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
}

impl Customer {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

pub type Customers = Vec<Customer>;
