//! grid-sql command line: render the queries for a list request, or run them
//! against a SQLite database and print the page envelope as JSON.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use grid_sql::{
    EngineConfig, Join, JoinKind, PageEnvelope, PagePlan, PageRequest, PagingCoordinator,
    QueryResult, Row, SortDir, SqlDialect, SqliteExecutor, TableDescriptor, Value,
    is_valid_column_ref, is_valid_sql_expression, is_valid_sql_identifier,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "grid-sql")]
#[command(about = "Render and run dialect-aware list, count and page queries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the SQL and parameters a request renders to
    Plan(QueryArgs),

    /// Run a request against a SQLite database (MySQL dialect only)
    Run {
        /// SQLite database file
        #[arg(long)]
        db: PathBuf,

        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Engine configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dialect, overriding the configuration file
    #[arg(long)]
    dialect: Option<SqlDialect>,

    /// Master table
    #[arg(long)]
    table: String,

    /// Select list, e.g. `t1.Id,t1.Name,pi.Url`
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Primary-key columns of the master table
    #[arg(long = "key", value_delimiter = ',')]
    keys: Vec<String>,

    /// Join as `kind:table:alias:condition`, e.g. `left:ProductImage:pi:pi.ProductId = t1.Id`
    #[arg(long = "join")]
    joins: Vec<String>,

    /// Soft-delete flag column
    #[arg(long)]
    soft_delete: Option<String>,

    /// Keyword-searchable columns
    #[arg(long, value_delimiter = ',')]
    searchable: Vec<String>,

    /// Whole request as JSON; the flags below are ignored when given
    #[arg(long)]
    request: Option<String>,

    /// Filters in `field::value::operator|...` form
    #[arg(long, default_value = "")]
    filters: String,

    /// Free-text keywords
    #[arg(long)]
    keywords: Option<String>,

    /// Comma-separated sort fields
    #[arg(long)]
    order_by: Option<String>,

    /// Sort descending
    #[arg(long)]
    desc: bool,

    #[arg(long, default_value_t = 0)]
    skip: u32,

    /// Page size; 0 uses the configured default
    #[arg(long, default_value_t = 0)]
    take: u32,

    /// Return every matching row without counting
    #[arg(long)]
    no_paging: bool,
}

impl QueryArgs {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(dialect) = self.dialect {
            config.dialect = dialect;
        }
        Ok(config)
    }

    fn descriptor(&self) -> Result<TableDescriptor> {
        if !is_valid_sql_identifier(&self.table) {
            bail!("invalid table name '{}'", self.table);
        }
        check_all(&self.columns, "column", is_valid_sql_expression)?;
        check_all(&self.keys, "key", is_valid_sql_identifier)?;
        check_all(&self.searchable, "searchable column", is_valid_column_ref)?;

        let mut table = TableDescriptor::new(&self.table)
            .columns(&as_strs(&self.columns))
            .primary_keys(&as_strs(&self.keys))
            .searchable(&as_strs(&self.searchable));
        for join in &self.joins {
            table = table.join(parse_join(join)?);
        }
        if let Some(flag) = &self.soft_delete {
            if !is_valid_sql_identifier(flag) {
                bail!("invalid soft-delete column '{flag}'");
            }
            table = table.soft_delete(flag);
        }
        Ok(table)
    }

    fn page_request(&self) -> Result<PageRequest> {
        if let Some(json) = &self.request {
            return serde_json::from_str(json).context("parsing --request");
        }

        let dir = if self.desc { SortDir::Desc } else { SortDir::Asc };
        let mut request = PageRequest::new()
            .with_filters(self.filters.as_str())
            .with_window(self.skip, self.take);
        if let Some(order) = &self.order_by {
            request = request.with_order(order.as_str(), dir);
        }
        if let Some(keywords) = &self.keywords {
            request = request.with_keywords(keywords.as_str());
        }
        if self.no_paging {
            request = request.without_paging();
        }
        Ok(request)
    }
}

fn as_strs(items: &[String]) -> Vec<&str> {
    items.iter().map(String::as_str).collect()
}

fn check_all(items: &[String], what: &str, valid: fn(&str) -> bool) -> Result<()> {
    if let Some(bad) = items.iter().find(|item| !valid(item)) {
        bail!("invalid {what} '{bad}'");
    }
    Ok(())
}

fn parse_join(arg: &str) -> Result<Join> {
    let parts: Vec<&str> = arg.splitn(4, ':').collect();
    let [kind, table, alias, on] = parts.as_slice() else {
        bail!("join '{arg}' is not kind:table:alias:condition");
    };
    let kind = match kind.trim().to_ascii_lowercase().as_str() {
        "inner" => JoinKind::Inner,
        "left" => JoinKind::Left,
        "right" => JoinKind::Right,
        other => bail!("unknown join kind '{other}'"),
    };
    Join::try_new(kind, table.trim(), alias.trim(), on.trim())
        .with_context(|| format!("invalid join '{arg}'"))
}

fn print_query(label: &str, query: &QueryResult) {
    println!("-- {label}");
    println!("{};", query.sql);
    if !query.params.is_empty() {
        let params: Vec<String> = query.params.iter().map(ToString::to_string).collect();
        println!("-- params: [{}]", params.join(", "));
    }
}

fn row_to_json(row: Row) -> serde_json::Value {
    let object = row
        .column_names()
        .map(|name| {
            let value = match row.get(name) {
                None | Some(Value::Null) => serde_json::Value::Null,
                Some(Value::Bool(b)) => serde_json::Value::Bool(*b),
                Some(Value::Int(i)) => serde_json::Value::from(*i),
                Some(Value::Float(f)) => serde_json::Number::from_f64(*f)
                    .map_or(serde_json::Value::Null, serde_json::Value::Number),
                Some(Value::String(s)) => serde_json::Value::String(s.clone()),
            };
            (name.to_string(), value)
        })
        .collect();
    serde_json::Value::Object(object)
}

fn plan(args: &QueryArgs) -> Result<()> {
    let config = args.engine_config()?;
    let table = args.descriptor()?;
    let request = args.page_request()?;

    match PagePlan::new(&config, &table, &request)? {
        PagePlan::Paged {
            window,
            count,
            rows,
        } => {
            print_query("count", &count);
            print_query(
                &format!("rows (skip {}, take {})", window.skip, window.take),
                &rows,
            );
        },
        PagePlan::Unpaged { rows } => print_query("rows", &rows),
    }
    Ok(())
}

async fn run(db: &Path, args: &QueryArgs) -> Result<()> {
    let config = args.engine_config()?;
    if config.dialect != SqlDialect::MySql {
        bail!("SQLite runs the mysql dialect only, not {}", config.dialect);
    }
    let table = args.descriptor()?;
    let request = args.page_request()?;

    let executor = SqliteExecutor::open(db).with_context(|| format!("opening {}", db.display()))?;
    let page: PageEnvelope<Row> = PagingCoordinator::new(&executor, &config)
        .fetch_page(&table, &request)
        .await?;
    info!(
        table = table.name(),
        total = page.total_item_count,
        rows = page.count,
        "page served"
    );

    let page = page.map(row_to_json);
    println!("{}", serde_json::to_string_pretty(&page)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!(?cli, "parsed arguments");

    match &cli.command {
        Command::Plan(args) => plan(args),
        Command::Run { db, query } => run(db, query).await,
    }
}
