//! These structs provide the CLI interface for the accountant CLI.

use crate::model::{Amount, Id};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// accountant: An offline bookkeeping ledger.
///
/// Keep track of the suppliers you pay, the expenses you pay them, and the invoices that go with
/// those expenses. Everything is stored locally in a single SQLite file. Reports total your
/// expenses by category and sub-category over a date range, and the whole ledger can be exported
/// to, and restored from, a JSON backup document.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and an empty ledger.
    ///
    /// This is the first command you should run. By default the data directory is
    /// $HOME/accountant. If you want it somewhere else then pass --accountant-home or set
    /// ACCOUNTANT_HOME.
    Init,
    /// Add or list suppliers.
    Supplier(SupplierArgs),
    /// Add or list expenses.
    Expense(ExpenseArgs),
    /// Retrieve stored invoice files.
    File(FileArgs),
    /// Total expenses by category and sub-category.
    ///
    /// Without any options the report covers the current financial year. Pass --from and/or --to
    /// for a custom range (inclusive), or --all for every expense.
    Report(ReportArgs),
    /// Write every supplier, expense and file to a JSON backup document.
    Export(ExportArgs),
    /// Restore a JSON backup document into the ledger.
    ///
    /// Each entry is written at its own id, replacing any record already at that id. Records that
    /// are not in the document are left alone. A snapshot of the ledger is saved in the backups
    /// directory before anything is written.
    Import(ImportArgs),
    /// Convert a suppliers CSV and an invoices CSV into a JSON backup document that can then be
    /// imported.
    Convert(ConvertArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber EnvFilter docs for syntax.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the ledger and configuration are held. Defaults to ~/accountant
    #[arg(long, env = "ACCOUNTANT_HOME", default_value_t = default_accountant_home())]
    accountant_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, accountant_home: PathBuf) -> Self {
        Self {
            log_level,
            accountant_home: accountant_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn accountant_home(&self) -> &DisplayPath {
        &self.accountant_home
    }
}

/// (Not shown): Args for the `accountant supplier` command.
#[derive(Debug, Parser, Clone)]
pub struct SupplierArgs {
    #[command(subcommand)]
    action: SupplierCommand,
}

impl SupplierArgs {
    pub fn new(action: SupplierCommand) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &SupplierCommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SupplierCommand {
    /// Add a new supplier.
    Add(SupplierAddArgs),
    /// List all suppliers.
    List,
}

/// (Not shown): Args for the `accountant supplier add` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct SupplierAddArgs {
    /// The supplier's name. Required.
    pub name: String,

    #[arg(long)]
    pub address: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// The category to prefill when adding expenses for this supplier.
    #[arg(long)]
    pub category: Option<String>,

    /// The sub-category to prefill when adding expenses for this supplier.
    #[arg(long)]
    pub sub_category: Option<String>,
}

/// (Not shown): Args for the `accountant expense` command.
#[derive(Debug, Parser, Clone)]
pub struct ExpenseArgs {
    #[command(subcommand)]
    action: ExpenseCommand,
}

impl ExpenseArgs {
    pub fn new(action: ExpenseCommand) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &ExpenseCommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExpenseCommand {
    /// Add a new expense, optionally with an invoice file.
    Add(ExpenseAddArgs),
    /// List expenses, newest first.
    List(ExpenseListArgs),
}

/// (Not shown): Args for the `accountant expense add` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct ExpenseAddArgs {
    /// The date of the expense, YYYY-MM-DD.
    #[arg(long)]
    pub date: String,

    /// The amount, e.g. 120.50 or "$1,020.50".
    #[arg(long)]
    pub amount: Amount,

    /// The id of the supplier. The supplier's default category and sub-category are used when
    /// --category or --sub-category are not given.
    #[arg(long)]
    pub supplier: Option<Id>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub sub_category: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// A file to store as the invoice for this expense.
    #[arg(long)]
    pub invoice: Option<PathBuf>,
}

/// (Not shown): Args for the `accountant expense list` command.
#[derive(Debug, Parser, Clone)]
pub struct ExpenseListArgs {
    /// The maximum number of expenses to show.
    #[arg(long, default_value_t = 100)]
    pub limit: usize,
}

/// (Not shown): Args for the `accountant file` command.
#[derive(Debug, Parser, Clone)]
pub struct FileArgs {
    #[command(subcommand)]
    action: FileCommand,
}

impl FileArgs {
    pub fn new(action: FileCommand) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &FileCommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum FileCommand {
    /// Write a stored file to disk.
    Get(FileGetArgs),
}

/// (Not shown): Args for the `accountant file get` command.
#[derive(Debug, Parser, Clone)]
pub struct FileGetArgs {
    /// The id of the file.
    pub id: Id,

    /// Where to write the file. Defaults to the file's original name in the current directory.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// (Not shown): Args for the `accountant report` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct ReportArgs {
    /// The first date to include, YYYY-MM-DD.
    #[arg(long)]
    pub from: Option<String>,

    /// The last date to include, YYYY-MM-DD.
    #[arg(long)]
    pub to: Option<String>,

    /// Include every expense regardless of date.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub all: bool,
}

/// (Not shown): Args for the `accountant export` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct ExportArgs {
    /// Where to write the backup document. Defaults to a new file in the backups directory.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// (Not shown): Args for the `accountant import` command.
#[derive(Debug, Parser, Clone)]
pub struct ImportArgs {
    /// The backup document to restore.
    pub path: PathBuf,
}

/// (Not shown): Args for the `accountant convert` command.
#[derive(Debug, Parser, Clone)]
pub struct ConvertArgs {
    /// The suppliers CSV.
    #[arg(long)]
    pub suppliers: PathBuf,

    /// The invoices CSV.
    #[arg(long)]
    pub invoices: PathBuf,

    /// Where to write the backup document.
    #[arg(long)]
    pub out: PathBuf,
}

fn default_accountant_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("accountant"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --accountant-home or ACCOUNTANT_HOME instead of relying on the \
                default accountant home directory. If you continue using the program right now, \
                you may have problems!",
            );
            PathBuf::from("accountant")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expense_add() {
        let args = Args::try_parse_from([
            "accountant",
            "--accountant-home",
            "/tmp/books",
            "expense",
            "add",
            "--date",
            "2024-07-15",
            "--amount",
            "$1,020.50",
            "--supplier",
            "3",
        ])
        .unwrap();
        assert_eq!(args.common().accountant_home().path(), Path::new("/tmp/books"));
        let Command::Expense(expense) = args.command() else {
            panic!("expected the expense command");
        };
        let ExpenseCommand::Add(add) = expense.action() else {
            panic!("expected expense add");
        };
        assert_eq!(add.amount, Amount::from_str("1020.50").unwrap());
        assert_eq!(add.supplier, Some(3));
        assert!(add.invoice.is_none());
    }

    #[test]
    fn test_parse_report_all_conflicts_with_bounds() {
        assert!(Args::try_parse_from(["accountant", "report", "--all", "--from", "2024-01-01"])
            .is_err());
        let args = Args::try_parse_from(["accountant", "report", "--to", "2024-06-30"]).unwrap();
        let Command::Report(report) = args.command() else {
            panic!("expected the report command");
        };
        assert_eq!(report.to.as_deref(), Some("2024-06-30"));
        assert!(!report.all);
    }

    #[test]
    fn test_expense_list_default_limit() {
        let args = Args::try_parse_from(["accountant", "expense", "list"]).unwrap();
        let Command::Expense(expense) = args.command() else {
            panic!("expected the expense command");
        };
        let ExpenseCommand::List(list) = expense.action() else {
            panic!("expected expense list");
        };
        assert_eq!(list.limit, 100);
    }
}
