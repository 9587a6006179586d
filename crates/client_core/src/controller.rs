//! Add-customer dialog: draft state, validation and submission.

use std::{fmt, str::FromStr, sync::Arc};

use shared::{domain::Customer, error::ApiError, protocol::CreateCustomerRequest};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{cache::CollectionCache, CustomerCreator};

const TASK_ERROR_CODE: &str = "task";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    FirstName,
    LastName,
    BusinessName,
    Email,
}

impl DraftField {
    pub const ALL: [DraftField; 4] = [
        DraftField::FirstName,
        DraftField::LastName,
        DraftField::BusinessName,
        DraftField::Email,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DraftField::FirstName => "First Name",
            DraftField::LastName => "Last Name",
            DraftField::BusinessName => "Business Name",
            DraftField::Email => "Email Address",
        }
    }

    pub fn is_required(self) -> bool {
        !matches!(self, DraftField::BusinessName)
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("unknown customer field '{0}'")]
pub struct UnknownFieldError(String);

impl FromStr for DraftField {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firstName" | "first_name" => Ok(DraftField::FirstName),
            "lastName" | "last_name" => Ok(DraftField::LastName),
            "businessName" | "business_name" => Ok(DraftField::BusinessName),
            "email" => Ok(DraftField::Email),
            other => Err(UnknownFieldError(other.to_string())),
        }
    }
}

/// In-progress values of the add-customer form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftCustomer {
    pub first_name: String,
    pub last_name: String,
    pub business_name: String,
    pub email: String,
}

impl DraftCustomer {
    pub fn get(&self, field: DraftField) -> &str {
        match field {
            DraftField::FirstName => &self.first_name,
            DraftField::LastName => &self.last_name,
            DraftField::BusinessName => &self.business_name,
            DraftField::Email => &self.email,
        }
    }

    fn slot(&mut self, field: DraftField) -> &mut String {
        match field {
            DraftField::FirstName => &mut self.first_name,
            DraftField::LastName => &mut self.last_name,
            DraftField::BusinessName => &mut self.business_name,
            DraftField::Email => &mut self.email,
        }
    }

    /// Required fields that are empty or whitespace-only, in form order.
    pub fn missing_required_fields(&self) -> Vec<DraftField> {
        DraftField::ALL
            .into_iter()
            .filter(|field| field.is_required() && self.get(*field).trim().is_empty())
            .collect()
    }

    /// Values are sent as typed; an empty business name is left out.
    pub fn to_request(&self) -> CreateCustomerRequest {
        CreateCustomerRequest {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            business_name: (!self.business_name.trim().is_empty())
                .then(|| self.business_name.clone()),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Please fill out all required fields: {}", format_fields(.missing))]
pub struct ValidationError {
    pub missing: Vec<DraftField>,
}

fn format_fields(fields: &[DraftField]) -> String {
    fields
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to create customer: {0}")]
    Create(ApiError),
    #[error("a customer is already being created")]
    InFlight,
    #[error("the add customer dialog is not open")]
    DialogClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Closed,
    Open,
    Submitting,
}

#[derive(Default)]
struct ControllerState {
    dialog_open: bool,
    submitting: bool,
    draft: DraftCustomer,
}

pub struct CreationFlowController {
    cache: Arc<CollectionCache<Customer>>,
    creator: Arc<dyn CustomerCreator>,
    inner: Arc<Mutex<ControllerState>>,
}

impl CreationFlowController {
    pub fn new(cache: Arc<CollectionCache<Customer>>, creator: Arc<dyn CustomerCreator>) -> Self {
        Self {
            cache,
            creator,
            inner: Arc::new(Mutex::new(ControllerState::default())),
        }
    }

    pub async fn open_dialog(&self) {
        self.inner.lock().await.dialog_open = true;
    }

    /// Hides the dialog. The draft is kept so reopening resumes the input.
    pub async fn close_dialog(&self) {
        self.inner.lock().await.dialog_open = false;
    }

    pub async fn set_field(&self, field: DraftField, value: impl Into<String>) {
        let mut guard = self.inner.lock().await;
        *guard.draft.slot(field) = value.into();
    }

    pub async fn draft(&self) -> DraftCustomer {
        self.inner.lock().await.draft.clone()
    }

    pub async fn dialog_state(&self) -> DialogState {
        let guard = self.inner.lock().await;
        if guard.submitting {
            DialogState::Submitting
        } else if guard.dialog_open {
            DialogState::Open
        } else {
            DialogState::Closed
        }
    }

    /// Validates the draft and creates the customer.
    ///
    /// On success the dialog is closed, the draft cleared and the cache
    /// revalidated before returning. On any failure the draft is left as it
    /// was and the cache is not touched.
    pub async fn submit(&self) -> Result<(), SubmitError> {
        let request = {
            let mut guard = self.inner.lock().await;
            if guard.submitting {
                return Err(SubmitError::InFlight);
            }
            if !guard.dialog_open {
                return Err(SubmitError::DialogClosed);
            }
            let missing = guard.draft.missing_required_fields();
            if !missing.is_empty() {
                warn!(missing = %format_fields(&missing), "customer draft is incomplete");
                return Err(ValidationError { missing }.into());
            }
            guard.submitting = true;
            guard.draft.to_request()
        };

        // The create runs on its own task so `submitting` is cleared even when
        // the caller stops waiting for the result.
        let task = tokio::spawn(create_and_settle(
            Arc::clone(&self.cache),
            Arc::clone(&self.creator),
            Arc::clone(&self.inner),
            request,
        ));
        match task.await {
            Ok(result) => result,
            Err(err) => {
                self.inner.lock().await.submitting = false;
                error!(key = %self.cache.key(), "customer create task failed: {err}");
                Err(SubmitError::Create(ApiError::new(
                    TASK_ERROR_CODE,
                    format!("customer create aborted: {err}"),
                )))
            }
        }
    }
}

async fn create_and_settle(
    cache: Arc<CollectionCache<Customer>>,
    creator: Arc<dyn CustomerCreator>,
    inner: Arc<Mutex<ControllerState>>,
    request: CreateCustomerRequest,
) -> Result<(), SubmitError> {
    let result = creator.create(cache.key(), &request).await;

    {
        let mut guard = inner.lock().await;
        guard.submitting = false;
        if let Err(err) = result {
            error!(
                key = %cache.key(),
                code = %err.code,
                "failed to create customer: {}",
                err.message
            );
            return Err(SubmitError::Create(err));
        }
        guard.dialog_open = false;
        guard.draft = DraftCustomer::default();
    }

    info!(key = %cache.key(), email = %request.email, "customer created");
    cache.revalidate().await;
    Ok(())
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
