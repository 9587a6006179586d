//! Line-driven stand-in for the customers page.

use std::sync::Arc;

use anyhow::{anyhow, bail};
use client_core::{
    CreationFlowController, CustomerCache, CustomersView, DialogView, DraftField, SubmitError,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::debug;

pub const HELP: &str = "\
commands:
  open                  open the add customer dialog
  close                 close the dialog (input is kept)
  set <field> <value>   firstName | lastName | businessName | email
  submit                create the customer
  refresh               re-fetch the customer list
  show                  print the list and the dialog
  help                  print this help
  quit                  leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Open,
    Close,
    Set(DraftField, String),
    Submit,
    Refresh,
    Show,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> anyhow::Result<Option<ShellCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let command = match verb {
        "open" => ShellCommand::Open,
        "close" => ShellCommand::Close,
        "set" => {
            let rest = rest.trim_start();
            if rest.is_empty() {
                bail!("usage: set <field> <value>");
            }
            let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            ShellCommand::Set(field.parse()?, value.trim_start().to_string())
        }
        "submit" => ShellCommand::Submit,
        "refresh" => ShellCommand::Refresh,
        "show" => ShellCommand::Show,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(anyhow!("unknown command '{other}', try 'help'")),
    };
    Ok(Some(command))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Silent,
    Quit,
}

pub struct Session {
    cache: Arc<CustomerCache>,
    controller: CreationFlowController,
}

impl Session {
    pub fn new(cache: Arc<CustomerCache>, controller: CreationFlowController) -> Self {
        Self { cache, controller }
    }

    async fn dialog_view(&self) -> DialogView {
        DialogView {
            state: self.controller.dialog_state().await,
            draft: self.controller.draft().await,
        }
    }

    pub async fn execute(&self, command: ShellCommand) -> Reply {
        match command {
            ShellCommand::Open => {
                self.controller.open_dialog().await;
                Reply::Output(self.dialog_view().await.to_string())
            }
            ShellCommand::Close => {
                self.controller.close_dialog().await;
                Reply::Output("Dialog closed.".to_string())
            }
            ShellCommand::Set(field, value) => {
                self.controller.set_field(field, value).await;
                Reply::Output(self.dialog_view().await.to_string())
            }
            ShellCommand::Submit => Reply::Output(match self.controller.submit().await {
                Ok(()) => "Customer created.".to_string(),
                Err(SubmitError::Create(err)) => {
                    format!("Could not create customer: {}", err.message)
                }
                Err(SubmitError::DialogClosed) => {
                    "Open the dialog first with 'open'.".to_string()
                }
                Err(err) => err.to_string(),
            }),
            ShellCommand::Refresh => {
                self.cache.revalidate().await;
                Reply::Silent
            }
            ShellCommand::Show => {
                let view = CustomersView::from_state(&self.cache.current_state().await);
                Reply::Output(format!("{view}{}", self.dialog_view().await))
            }
            ShellCommand::Help => Reply::Output(HELP.to_string()),
            ShellCommand::Quit => Reply::Quit,
        }
    }
}

/// Runs the interactive loop until `quit` or end of input.
///
/// Settled cache states are rendered by a background task as they arrive.
pub async fn run(session: Session) -> anyhow::Result<()> {
    let mut events = session.cache.subscribe();
    let renderer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(state) if !state.is_validating => {
                    println!("{}", CustomersView::from_state(&state));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "renderer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{HELP}");
    session.cache.initialize().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match session.execute(command).await {
            Reply::Output(text) => println!("{}", text.trim_end()),
            Reply::Silent => {}
            Reply::Quit => break,
        }
    }

    renderer.abort();
    Ok(())
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
