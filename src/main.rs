use clap::Parser;
use sms_ledger::args::{
    AccountsSubcommand, Args, CategoriesSubcommand, Command, TransactionsSubcommand,
};
use sms_ledger::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().ledger_home().path();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args).await?.print(),

        Command::Import(import_args) => {
            let config = Config::load(home).await?;
            commands::import(config, import_args).await?.print()
        }

        Command::Transactions(subcommand) => {
            let config = Config::load(home).await?;
            match subcommand {
                TransactionsSubcommand::List(args) => {
                    commands::list_transactions(config, args).await?.print()
                }
                TransactionsSubcommand::Get(args) => {
                    commands::get_transaction(config, args).await?.print()
                }
                TransactionsSubcommand::Delete(args) => {
                    commands::delete_transactions(config, args).await?.print()
                }
                TransactionsSubcommand::Categorize(args) => {
                    commands::categorize_transaction(config, args)
                        .await?
                        .print()
                }
            }
        }

        Command::Categories(subcommand) => {
            let config = Config::load(home).await?;
            match subcommand {
                CategoriesSubcommand::List => commands::list_categories(config).await?.print(),
                CategoriesSubcommand::Add(args) => {
                    commands::add_category(config, args).await?.print()
                }
                CategoriesSubcommand::Update(args) => {
                    commands::update_category(config, args).await?.print()
                }
                CategoriesSubcommand::Delete(args) => {
                    commands::delete_categories(config, args).await?.print()
                }
            }
        }

        Command::Accounts(AccountsSubcommand::List) => {
            let config = Config::load(home).await?;
            commands::list_accounts(config).await?.print()
        }

        Command::Summary(summary_args) => {
            let config = Config::load(home).await?;
            commands::summary(config, summary_args).await?.print()
        }

        Command::Watch(watch_args) => {
            let config = Config::load(home).await?;
            commands::watch(config, watch_args).await?.print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use the requested level for this crate only.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
