use accountant::args::{Args, Command, ExpenseCommand, FileCommand, SupplierCommand};
use accountant::{commands, Config, Result};
use clap::Parser;
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
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().accountant_home().path();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init => commands::init(home).await?.print(),

        Command::Supplier(supplier_args) => {
            let config = Config::load(home).await?;
            match supplier_args.action() {
                SupplierCommand::Add(args) => {
                    commands::add_supplier(config, args.clone()).await?.print()
                }
                SupplierCommand::List => commands::list_suppliers(config).await?.print(),
            }
        }

        Command::Expense(expense_args) => {
            let config = Config::load(home).await?;
            match expense_args.action() {
                ExpenseCommand::Add(args) => {
                    commands::add_expense(config, args.clone()).await?.print()
                }
                ExpenseCommand::List(args) => {
                    commands::list_expenses(config, args.limit).await?.print()
                }
            }
        }

        Command::File(file_args) => {
            let config = Config::load(home).await?;
            match file_args.action() {
                FileCommand::Get(args) => commands::get_file(config, args.clone()).await?.print(),
            }
        }

        Command::Report(report_args) => {
            let config = Config::load(home).await?;
            commands::report(config, report_args.clone()).await?.print()
        }

        Command::Export(export_args) => {
            let config = Config::load(home).await?;
            commands::export(config, export_args.out.as_deref())
                .await?
                .print()
        }

        Command::Import(import_args) => {
            let config = Config::load(home).await?;
            commands::import(config, &import_args.path).await?.print()
        }

        Command::Convert(convert_args) => commands::convert(convert_args.clone()).await?.print(),
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
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
