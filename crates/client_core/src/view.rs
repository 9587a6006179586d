//! Text view model derived from cache and dialog state.

use std::fmt;

use shared::domain::Customer;

use crate::{
    cache::CollectionState,
    controller::{DialogState, DraftCustomer, DraftField},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Loading,
    Refreshing,
    Error(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Loading => f.write_str("Loading..."),
            Notice::Refreshing => f.write_str("Refreshing..."),
            Notice::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRow {
    pub key: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomersView {
    pub heading: String,
    pub notice: Option<Notice>,
    pub rows: Vec<CustomerRow>,
    pub show_table: bool,
}

impl CustomersView {
    /// An error hides the table even when stale data is still cached.
    pub fn from_state(state: &CollectionState<Customer>) -> Self {
        let heading = match &state.data {
            Some(customers) => format!("{} Customers", customers.len()),
            None => "Customers".to_string(),
        };

        let notice = if let Some(err) = &state.error {
            Some(Notice::Error(err.message.clone()))
        } else if state.is_loading {
            Some(Notice::Loading)
        } else if state.is_validating {
            Some(Notice::Refreshing)
        } else {
            None
        };

        let show_table = state.error.is_none() && state.data.is_some();
        let rows = match (&state.data, show_table) {
            (Some(customers), true) => customers
                .iter()
                .map(|customer| CustomerRow {
                    key: customer.email.clone(),
                    name: customer.display_name(),
                    email: customer.email.clone(),
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            heading,
            notice,
            rows,
            show_table,
        }
    }
}

impl fmt::Display for CustomersView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.heading)?;
        if let Some(notice) = &self.notice {
            writeln!(f, "{notice}")?;
        }
        if !self.show_table {
            return Ok(());
        }

        let name_width = self
            .rows
            .iter()
            .map(|row| row.name.chars().count())
            .chain(std::iter::once("Name".len()))
            .max()
            .unwrap_or_default();
        writeln!(f, "{:<name_width$}  Email", "Name")?;
        for row in &self.rows {
            writeln!(f, "{:<name_width$}  {}", row.name, row.email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogView {
    pub state: DialogState,
    pub draft: DraftCustomer,
}

impl fmt::Display for DialogView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.state == DialogState::Closed {
            return Ok(());
        }
        writeln!(f, "Add Customer")?;
        for field in DraftField::ALL {
            let marker = if field.is_required() { "*" } else { "" };
            writeln!(f, "  {}{marker}: {}", field.label(), self.draft.get(field))?;
        }
        if self.state == DialogState::Submitting {
            writeln!(f, "  Creating...")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
