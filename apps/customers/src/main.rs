use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    CollectionCache, CreationFlowController, CustomerCache, CustomersView, DraftField,
    HttpCustomerApi,
};
use shared::domain::Customer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod shell;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "List and create customers against a customers API")]
struct Cli {
    /// Config file; defaults to ./customers.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured API base url.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and print the customer list.
    List,
    /// Create one customer and print the refreshed list.
    Create {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        business_name: Option<String>,
    },
    /// Interactive session mirroring the customers page.
    Shell,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    info!(
        api_url = %settings.api_url,
        collection = %settings.collection_path,
        "customers client starting"
    );

    let api = Arc::new(
        HttpCustomerApi::with_timeout(&settings.api_url, settings.request_timeout())
            .context("failed to build customers api client")?,
    );
    let cache: Arc<CustomerCache> =
        CollectionCache::<Customer>::new(settings.collection_path.clone(), api.clone());
    let controller = CreationFlowController::new(Arc::clone(&cache), api);

    match cli.command {
        Command::List => {
            let state = cache.initialize().await;
            print!("{}", CustomersView::from_state(&state));
            if state.error.is_some() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Create {
            first_name,
            last_name,
            email,
            business_name,
        } => {
            cache.initialize().await;
            controller.open_dialog().await;
            controller.set_field(DraftField::FirstName, first_name).await;
            controller.set_field(DraftField::LastName, last_name).await;
            controller.set_field(DraftField::Email, email).await;
            if let Some(business_name) = business_name {
                controller
                    .set_field(DraftField::BusinessName, business_name)
                    .await;
            }

            if let Err(err) = controller.submit().await {
                println!("{err}");
                return Ok(ExitCode::FAILURE);
            }
            println!("Customer created.");
            print!(
                "{}",
                CustomersView::from_state(&cache.current_state().await)
            );
        }
        Command::Shell => {
            shell::run(shell::Session::new(cache, controller)).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
