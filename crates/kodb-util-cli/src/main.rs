//! kodb-util CLI - administer the OpenKO SQL Server databases.

use clap::{CommandFactory, Parser};
use kodb_util::config::DEFAULT_CONFIG_FILE_NAME;
use kodb_util::{
    Actions, Config, DirectoryModelCatalog, JobRunner, KodbError, Layout, MssqlSessionFactory,
    Overrides,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "kodb-util")]
#[command(about = "Clean, import and export the OpenKO SQL Server databases")]
#[command(version)]
struct Cli {
    /// Drop each database and its logins
    #[arg(long)]
    clean: bool,

    /// Clean, then recreate each database from the artifact tree
    #[arg(long)]
    import: bool,

    /// Export table structure to ManualSetup
    #[arg(long)]
    export_structure: bool,

    /// Export table data to ManualSetup
    #[arg(long)]
    export_data: bool,

    /// Export view definitions to ManualSetup
    #[arg(long)]
    export_views: bool,

    /// Export stored procedure definitions to ManualSetup
    #[arg(long)]
    export_procs: bool,

    /// Export structure, data, views and stored procedures
    #[arg(long)]
    export_all: bool,

    /// Reconcile jsonSchema documents with the live tables
    #[arg(long)]
    export_schema_document: bool,

    /// Also write template-generated import scripts to ManualSetup
    #[arg(long)]
    create_manual_artifacts: bool,

    /// Leave index lists in schema documents untouched
    #[arg(long)]
    skip_index_metadata: bool,

    /// Path to YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Override databaseConfig.user (empty selects Windows authentication)
    #[arg(long)]
    db_user: Option<String>,

    /// Override databaseConfig.password
    #[arg(long)]
    db_pass: Option<String>,

    /// Override genConfig.schemaDir
    #[arg(long)]
    schema_dir: Option<PathBuf>,

    /// Override genConfig.importBatchSize (rows per data-dump window, 2-999)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,
}

impl Cli {
    fn actions(&self) -> Actions {
        Actions {
            clean: self.clean,
            import: self.import,
            export_structure: self.export_structure,
            export_data: self.export_data,
            export_views: self.export_views,
            export_procs: self.export_procs,
            export_all: self.export_all,
            export_schema_document: self.export_schema_document,
            create_manual_artifacts: self.create_manual_artifacts,
            include_indexes: !self.skip_index_metadata,
        }
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            db_user: self.db_user.clone(),
            db_pass: self.db_pass.clone(),
            schema_dir: self.schema_dir.clone(),
            import_batch_size: self.batch_size,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), KodbError> {
    let cli = Cli::parse();

    let actions = cli.actions();
    if !actions.has_action() {
        Cli::command().print_help()?;
    }
    actions.validate()?;

    setup_logging(&cli.verbosity, &cli.log_format).map_err(KodbError::Config)?;

    let config = Config::load(&cli.config)?.with_overrides(cli.overrides())?;
    info!("Loaded configuration from {:?}", cli.config);

    if config.database_config.uses_windows_auth() {
        info!("No database user configured, using Windows authentication");
    }

    let layout = Layout::new(&config.gen_config.schema_dir);
    let factory = MssqlSessionFactory::new(config.database_config.clone());
    let models = DirectoryModelCatalog::new(&layout);

    JobRunner::new(&config, &factory, &models).run(&actions).await?;
    println!("Done: {} database(s) processed", config.gen_config.databases.len());
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}', expected text or json", other)),
    }

    Ok(())
}
