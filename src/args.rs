//! These structs provide the CLI interface for the sms-ledger CLI.

use crate::spending::Flow;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// sms-ledger: A local ledger of the transactions found in your bank's text messages.
///
/// Messages are parsed elsewhere; this program takes the parsed evidence (see `import`), stores
/// one transaction per message, and lets you categorize, query and summarize them. Importing the
/// same message twice never creates a duplicate.
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
    /// Create the data directory, the configuration file and the database.
    ///
    /// This is the first command you should run. The database starts out with a default set of
    /// categories.
    Init(InitArgs),
    /// Import parsed message evidence from a CSV file.
    ///
    /// The file needs a header row with at least `address` and `body`. Rows that were imported
    /// before are replaced rather than duplicated.
    Import(ImportArgs),
    /// List, show, delete or categorize transactions.
    #[command(subcommand)]
    Transactions(TransactionsSubcommand),
    /// List, add, update or delete categories.
    #[command(subcommand)]
    Categories(CategoriesSubcommand),
    /// Show stored account metadata.
    #[command(subcommand)]
    Accounts(AccountsSubcommand),
    /// Show the transaction count, date range and spending by category.
    Summary(SummaryArgs),
    /// Print the matching transactions, then print them again whenever they change. Stop with
    /// Ctrl-C.
    Watch(WatchArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the ledger data and configuration is held. Defaults to ~/sms-ledger
    #[arg(long, env = "SMS_LEDGER_HOME", default_value_t = default_ledger_home())]
    ledger_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, ledger_home: PathBuf) -> Self {
        Self {
            log_level,
            ledger_home: ledger_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn ledger_home(&self) -> &DisplayPath {
        &self.ledger_home
    }
}

/// Args for the `sms-ledger init` command.
#[derive(Debug, ClapArgs, Clone, Default)]
pub struct InitArgs {
    /// The owner to record on imported transactions.
    #[arg(long)]
    user_id: Option<String>,
}

impl InitArgs {
    pub fn new(user_id: Option<String>) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

/// Args for the `sms-ledger import` command.
#[derive(Debug, ClapArgs, Clone)]
pub struct ImportArgs {
    /// The CSV file to import.
    file: PathBuf,
}

impl ImportArgs {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum TransactionsSubcommand {
    /// List transactions, newest first.
    List(ListTransactionsArgs),
    /// Show one transaction, including the message it came from.
    Get(TransactionIdArg),
    /// Delete transactions. Ids that do not exist are skipped.
    Delete(DeleteTransactionsArgs),
    /// Assign a category to a transaction, or clear it when --category is omitted.
    Categorize(CategorizeArgs),
}

/// Selects a set of transactions: a date range, a category, or everything.
#[derive(Debug, ClapArgs, Clone, Default)]
pub struct Selection {
    /// The first day to include (YYYY-MM-DD).
    #[arg(long, requires = "to", conflicts_with = "category")]
    from: Option<Day>,

    /// The last day to include (YYYY-MM-DD).
    #[arg(long, requires = "from", conflicts_with = "category")]
    to: Option<Day>,

    /// Only transactions assigned to this category id.
    #[arg(long)]
    category: Option<String>,
}

impl Selection {
    pub fn new(from: Option<Day>, to: Option<Day>, category: Option<String>) -> Self {
        Self { from, to, category }
    }

    /// The inclusive range from the start of `from` to the end of `to`, when both are given.
    pub fn range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Some((from.start(), to.end())),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// Args for `sms-ledger transactions list`.
#[derive(Debug, ClapArgs, Clone, Default)]
pub struct ListTransactionsArgs {
    #[clap(flatten)]
    selection: Selection,

    /// Only transactions without a category.
    #[arg(long, conflicts_with_all = ["from", "to", "category"])]
    uncategorized: bool,
}

impl ListTransactionsArgs {
    pub fn new(selection: Selection, uncategorized: bool) -> Self {
        Self {
            selection,
            uncategorized,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn uncategorized(&self) -> bool {
        self.uncategorized
    }
}

#[derive(Debug, ClapArgs, Clone)]
pub struct TransactionIdArg {
    /// The transaction id.
    id: String,
}

impl TransactionIdArg {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, ClapArgs, Clone)]
pub struct DeleteTransactionsArgs {
    /// One or more transaction ids.
    #[arg(required = true)]
    ids: Vec<String>,
}

impl DeleteTransactionsArgs {
    pub fn new<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

#[derive(Debug, ClapArgs, Clone)]
pub struct CategorizeArgs {
    /// The transaction id.
    id: String,

    /// The category id to assign. Omit it to mark the transaction uncategorized.
    #[arg(long)]
    category: Option<String>,
}

impl CategorizeArgs {
    pub fn new(id: impl Into<String>, category: Option<String>) -> Self {
        Self {
            id: id.into(),
            category,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoriesSubcommand {
    /// List all categories.
    List,
    /// Create a category.
    Add(AddCategoryArgs),
    /// Rename or recolor a category.
    Update(UpdateCategoryArgs),
    /// Delete categories. Transactions keep pointing at the deleted id.
    Delete(DeleteCategoriesArgs),
}

#[derive(Debug, ClapArgs, Clone)]
pub struct AddCategoryArgs {
    /// The display name. Names do not need to be unique.
    #[arg(long)]
    name: String,

    /// The color as #RRGGBB or #AARRGGBB. Defaults to opaque grey.
    #[arg(long)]
    color: Option<String>,
}

impl AddCategoryArgs {
    pub fn new(name: impl Into<String>, color: Option<String>) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}

#[derive(Debug, ClapArgs, Clone)]
pub struct UpdateCategoryArgs {
    /// The category id.
    id: String,

    /// The new name.
    #[arg(long)]
    name: Option<String>,

    /// The new color as #RRGGBB or #AARRGGBB.
    #[arg(long)]
    color: Option<String>,
}

impl UpdateCategoryArgs {
    pub fn new(id: impl Into<String>, name: Option<String>, color: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            color,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}

#[derive(Debug, ClapArgs, Clone)]
pub struct DeleteCategoriesArgs {
    /// One or more category ids.
    #[arg(required = true)]
    ids: Vec<String>,
}

impl DeleteCategoriesArgs {
    pub fn new<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum AccountsSubcommand {
    /// List stored accounts.
    List,
}

/// Args for the `sms-ledger summary` command.
#[derive(Debug, ClapArgs, Clone, Default)]
pub struct SummaryArgs {
    /// Only count transactions in this year.
    #[arg(long)]
    year: Option<i32>,

    /// Only count transactions in this month (1-12).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    /// Only count income.
    #[arg(long, conflicts_with = "expense")]
    income: bool,

    /// Only count expenses.
    #[arg(long)]
    expense: bool,
}

impl SummaryArgs {
    pub fn new(year: Option<i32>, month: Option<u32>, flow: Option<Flow>) -> Self {
        Self {
            year,
            month,
            income: flow == Some(Flow::Income),
            expense: flow == Some(Flow::Expense),
        }
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn flow(&self) -> Option<Flow> {
        match (self.income, self.expense) {
            (true, _) => Some(Flow::Income),
            (_, true) => Some(Flow::Expense),
            _ => None,
        }
    }
}

/// Args for the `sms-ledger watch` command.
#[derive(Debug, ClapArgs, Clone, Default)]
pub struct WatchArgs {
    #[clap(flatten)]
    selection: Selection,
}

impl WatchArgs {
    pub fn new(selection: Selection) -> Self {
        Self { selection }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }
}

/// A calendar day in UTC, given on the command line as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Day(NaiveDate);

impl Day {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The first millisecond of the day.
    pub fn start(&self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }

    /// The last millisecond of the day.
    pub fn end(&self) -> DateTime<Utc> {
        match self.0.checked_add_days(Days::new(1)) {
            Some(next) => next.and_time(NaiveTime::MIN).and_utc() - TimeDelta::milliseconds(1),
            None => DateTime::<Utc>::MAX_UTC,
        }
    }
}

impl FromStr for Day {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map(Self)
    }
}

impl Display for Day {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

fn default_ledger_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("sms-ledger"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --ledger-home or SMS_LEDGER_HOME instead of relying on the \
                default ledger home directory. If you continue using the program right now, you \
                may have problems!",
            );
            PathBuf::from("sms-ledger")
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
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
