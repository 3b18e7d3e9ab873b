mod config;
mod contact;
mod controller;
mod filter;
mod logging;
mod remote;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::task::LocalSet;

use config::Config;
use controller::effects::settle;
use controller::{NoticeKind, Phonebook};
use remote::{ContactService, HttpContactService};

#[derive(Parser, Debug)]
#[command(name = "phonebook", version, about = "Terminal phonebook for a REST contact collection")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Collection URL, overrides `server_url` from the configuration
    #[arg(long, value_name = "URL", global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print contacts as id<TAB>name<TAB>number
    List(ListArgs),
    /// Add a contact
    Add(AddArgs),
    /// Delete the contact with this exact name
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Only show names containing this text (case-sensitive)
    #[arg(long)]
    filter: Option<String>,
}

#[derive(Args, Debug)]
struct AddArgs {
    name: String,
    number: String,
}

#[derive(Args, Debug)]
struct DeleteArgs {
    name: String,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(url) = cli.server.as_deref() {
        config
            .override_server_url(url)
            .context("invalid --server URL")?;
    }

    logging::init(&config.log)?;
    tracing::info!(
        server = %config.server_url,
        config = ?config.config_path,
        "starting phonebook"
    );

    let service = HttpContactService::new(&config.server_url, config.request_timeout)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match cli.command {
        Some(command) => runtime.block_on(run_command(command, &config, &service)),
        None => {
            let local = LocalSet::new();
            local.block_on(&runtime, async {
                let mut app = ui::app::App::new(&config, Rc::new(service));
                app.run().await
            })?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_command<S: ContactService>(
    command: Command,
    config: &Config,
    service: &S,
) -> Result<ExitCode> {
    let mut book = Phonebook::new(config.notice_timeout);
    let effects = book.mount();
    settle(&mut book, service, effects).await;
    if let Some(failure) = report_error(&book) {
        return Ok(failure);
    }

    match command {
        Command::List(args) => {
            book.set_filter(args.filter.unwrap_or_default());
            for contact in book.visible() {
                println!("{}\t{}\t{}", contact.id, contact.name, contact.number);
            }
        }
        Command::Add(args) => {
            let effects = book.submit(&args.name, &args.number);
            let settled = settle(&mut book, service, effects).await;
            if let Some(alert) = settled.alerts.first() {
                eprintln!("{alert}");
                return Ok(ExitCode::FAILURE);
            }
            if let Some(failure) = report_error(&book) {
                return Ok(failure);
            }
            if let Some(notice) = book.notice(NoticeKind::Info) {
                println!("{}", notice.message);
            }
        }
        Command::Delete(args) => {
            let Some(contact) = contact::find_by_name(book.contacts(), &args.name).cloned() else {
                eprintln!("No contact named '{}' in phonebook", args.name);
                return Ok(ExitCode::FAILURE);
            };
            let effects = book.delete(contact);
            settle(&mut book, service, effects).await;
            if let Some(failure) = report_error(&book) {
                return Ok(failure);
            }
            println!("'{}' removed from phonebook", args.name);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Print the error notice, if any, and turn it into a failing exit code.
fn report_error(book: &Phonebook) -> Option<ExitCode> {
    let notice = book.notice(NoticeKind::Error)?;
    eprintln!("{}", notice.message);
    Some(ExitCode::FAILURE)
}
