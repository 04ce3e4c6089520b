//! fortisync CLI entrypoint.
//!
//! This is the main entrypoint for the fortisync command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use fortisync::cli::{Cli, Commands, LogFormat, OutputFormatter, SchemaCommands, StateCommands};
use fortisync::client::{FortiManagerClient, RequestOptions};
use fortisync::config::{find_config_file, ConfigParser, ConfigValidator, SyncConfig};
use fortisync::error::{Result, SchemaError, StateError};
use fortisync::reconciler::Reconciler;
use fortisync::resource::ResourceDispatcher;
use fortisync::schema::SchemaRegistry;
use fortisync::state::{HistoryEntry, LocalStateStore, StateStore, SyncOperation};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system. `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Main async entry point. Returns `false` when the command ran but did not
/// fully succeed.
async fn run(cli: Cli) -> Result<bool> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force).map(|()| true),
        Commands::Validate { warnings } => cmd_validate(config_path, warnings, &formatter),
        Commands::Plan { detailed } => cmd_plan(config_path, detailed, &formatter).await.map(|()| true),
        Commands::Apply { yes, continue_on_error } => {
            cmd_apply(config_path, yes, continue_on_error, &formatter).await
        }
        Commands::Refresh => cmd_refresh(config_path, &formatter).await,
        Commands::Drift => cmd_drift(config_path, &formatter).await,
        Commands::Import { name, id } => {
            cmd_import(config_path, &name, &id, &formatter).await.map(|()| true)
        }
        Commands::Destroy { yes, continue_on_error } => {
            cmd_destroy(config_path, yes, continue_on_error, &formatter).await
        }
        Commands::Schema { command } => cmd_schema(config_path, command, &formatter).map(|()| true),
        Commands::State { command } => cmd_state(config_path, command, &formatter).await.map(|()| true),
    }
}

/// Initialize a new project.
fn cmd_init(path: &Path, force: bool) -> Result<()> {
    info!("Initializing new fortisync project in: {}", path.display());

    let config_path = path.join("fortisync.yaml");
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    std::fs::write(&config_path, include_str!("../templates/fortisync.yaml"))?;
    eprintln!("Created: {}", config_path.display());

    std::fs::write(&env_path, include_str!("../templates/env.example"))?;
    eprintln!("Created: {}", env_path.display());

    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let missing: Vec<&str> = [".env", ".fortisync/"]
            .into_iter()
            .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
            .collect();
        if !missing.is_empty() {
            let mut file = std::fs::OpenOptions::new().append(true).open(&gitignore_path)?;
            writeln!(file, "\n# fortisync")?;
            for entry in missing {
                writeln!(file, "{entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n.fortisync/\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nProject initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and fill in your FortiManager credentials");
    eprintln!("  2. Edit fortisync.yaml with the objects to manage");
    eprintln!("  3. Run 'fortisync validate' to check your configuration");
    eprintln!("  4. Run 'fortisync plan' to see what will change");
    eprintln!("  5. Run 'fortisync apply' to push the configuration");

    Ok(())
}

/// Validate configuration. Nothing is sent to FortiManager.
fn cmd_validate(config_path: Option<&PathBuf>, show_warnings: bool, formatter: &OutputFormatter) -> Result<bool> {
    let (config, config_file) = load_config(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let registry = build_registry(&config)?;
    let result = ConfigValidator::new(&registry).check(&config);

    emit(&formatter.format_validation(&result, show_warnings))?;
    if !formatter.is_json() && result.errors.is_empty() {
        eprintln!("\nConfiguration summary:");
        eprintln!("  Endpoint: {}", config.provider.url);
        eprintln!("  Resources: {}", config.resources.len());
        eprintln!("  Resource types: {}", registry.len());
    }

    Ok(result.errors.is_empty())
}

/// Show what an apply would change.
async fn cmd_plan(config_path: Option<&PathBuf>, detailed: bool, formatter: &OutputFormatter) -> Result<()> {
    let ctx = Context::connect(config_path).await?;
    let report = ctx.reconciler().plan().await;
    ctx.close().await;

    emit(&formatter.format_plan(&report?, detailed))
}

/// Apply the configuration.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    continue_on_error: bool,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let ctx = Context::connect(config_path).await?;
    let result = apply(&ctx, auto_approve, continue_on_error, formatter).await;
    ctx.close().await;
    result
}

async fn apply(
    ctx: &Context,
    auto_approve: bool,
    continue_on_error: bool,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let reconciler = ctx.reconciler().with_continue_on_error(continue_on_error);

    if !auto_approve {
        let report = reconciler.plan().await?;
        if report.plan.is_empty() {
            emit(&formatter.format_plan(&report, false))?;
            return Ok(true);
        }
        eprintln!("{}", formatter.format_plan(&report, false));
        if !confirm("Do you want to apply this plan? [y/N]: ", "y")? {
            eprintln!("Apply cancelled.");
            return Ok(true);
        }
    }

    let result = reconciler.reconcile().await?;
    emit(&formatter.format_reconciliation(&result))?;
    Ok(result.success)
}

/// Re-read every managed object.
async fn cmd_refresh(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<bool> {
    let ctx = Context::connect(config_path).await?;
    let result = ctx.reconciler().refresh().await;
    ctx.close().await;

    let result = result?;
    emit(&formatter.format_refresh(&result))?;
    Ok(result.errors.is_empty())
}

/// Check for drift. Exits non-zero when FortiManager differs from state.
async fn cmd_drift(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<bool> {
    let ctx = Context::connect(config_path).await?;
    let report = ctx.reconciler().check_drift().await;
    ctx.close().await;

    let report = report?;
    emit(&formatter.format_drift(&report))?;
    Ok(report.is_converged())
}

/// Import an existing object.
async fn cmd_import(config_path: Option<&PathBuf>, name: &str, id: &str, formatter: &OutputFormatter) -> Result<()> {
    let ctx = Context::connect(config_path).await?;
    let record = ctx.reconciler().import(name, id).await;
    ctx.close().await;

    emit(&formatter.format_record(&record?))
}

/// Delete every managed object.
async fn cmd_destroy(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    continue_on_error: bool,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let ctx = Context::connect(config_path).await?;
    let result = destroy(&ctx, auto_approve, continue_on_error, formatter).await;
    ctx.close().await;
    result
}

async fn destroy(
    ctx: &Context,
    auto_approve: bool,
    continue_on_error: bool,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let Some(state) = ctx.state_store.load().await? else {
        eprintln!("No state found, nothing to destroy.");
        return Ok(true);
    };
    if state.resources.is_empty() {
        eprintln!("No managed resources to destroy.");
        return Ok(true);
    }

    eprintln!("The following objects will be deleted from {}:", state.endpoint);
    for record in state.resources.values() {
        eprintln!("  - {} {} ({})", record.resource_type, record.name, record.id);
    }

    if !auto_approve && !confirm("\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ", "destroy")? {
        eprintln!("Destruction cancelled.");
        return Ok(true);
    }

    let result = ctx
        .reconciler()
        .with_continue_on_error(continue_on_error)
        .destroy()
        .await?;
    emit(&formatter.format_reconciliation(&result))?;
    Ok(result.success)
}

/// Schema inspection commands. Works without a configuration file.
fn cmd_schema(config_path: Option<&PathBuf>, command: SchemaCommands, formatter: &OutputFormatter) -> Result<()> {
    let registry = match load_config(config_path) {
        Ok((config, _)) => build_registry(&config)?,
        Err(e) => {
            debug!("No configuration loaded ({e}), using built-in schemas");
            SchemaRegistry::with_builtins()
        }
    };

    match command {
        SchemaCommands::List => emit(&formatter.format_schema_list(&registry)),
        SchemaCommands::Show { resource_type } => {
            let descriptor = registry
                .get(&resource_type)
                .ok_or_else(|| SchemaError::UnknownType { resource_type: resource_type.clone() })?;
            emit(&formatter.format_schema(descriptor))
        }
    }
}

/// State management commands. Nothing is sent to FortiManager.
async fn cmd_state(config_path: Option<&PathBuf>, command: StateCommands, formatter: &OutputFormatter) -> Result<()> {
    let (config, config_file) = load_config(config_path)?;
    let state_store = state_store(&config, &config_file);

    match command {
        StateCommands::Show => {
            if let Some(state) = state_store.load().await? {
                emit(&formatter.format_state(&state))?;
            } else {
                eprintln!("No state found at {}.", state_store.location());
            }
        }
        StateCommands::Lock { holder } => {
            let lock = state_store.acquire_lock(holder.as_deref().unwrap_or(""), "manual").await?;
            emit(&formatter.format_lock(&lock))?;
        }
        StateCommands::Unlock { lock_id, force } => {
            if force {
                match state_store.force_unlock().await? {
                    Some(lock) => eprintln!("State forcefully unlocked (was held by {}).", lock.holder),
                    None => eprintln!("State is not locked."),
                }
            } else if let Some(id) = lock_id {
                state_store.release_lock(&id).await?;
                eprintln!("State unlocked.");
            } else {
                eprintln!("Please provide --lock-id or use --force");
            }
        }
        StateCommands::Rm { name } => {
            let lock = state_store.acquire_lock("", "state rm").await?;
            let result = remove_record(&state_store, &name).await;
            if let Err(e) = state_store.release_lock(&lock.lock_id).await {
                warn!("Failed to release state lock: {e}");
            }
            result?;
            eprintln!("Removed {name} from state. The object on FortiManager was not touched.");
        }
    }

    Ok(())
}

async fn remove_record(state_store: &LocalStateStore, name: &str) -> Result<()> {
    let mut state = state_store
        .load()
        .await?
        .ok_or_else(|| StateError::UnknownResource { name: name.to_string() })?;

    if state.remove_resource(name).is_none() {
        return Err(StateError::UnknownResource { name: name.to_string() }.into());
    }
    let entry = HistoryEntry::new(SyncOperation::Remove, &state.config_hash, vec![name.to_string()]);
    state.add_history(entry);
    state_store.save(&state).await
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Everything a command talking to FortiManager needs.
struct Context {
    config: SyncConfig,
    registry: SchemaRegistry,
    state_store: LocalStateStore,
    client: FortiManagerClient,
    dispatcher: ResourceDispatcher,
}

impl Context {
    /// Loads and validates the configuration, then logs in.
    async fn connect(config_path: Option<&PathBuf>) -> Result<Self> {
        let (config, config_file) = load_config(config_path)?;
        let registry = build_registry(&config)?;

        let validation = ConfigValidator::new(&registry).validate(&config)?;
        for warning in &validation.warnings {
            warn!("{warning}");
        }

        let state_store = state_store(&config, &config_file);
        let timeout = Duration::from_secs(config.provider.timeout_secs);
        let credentials = ConfigParser::credentials()?;
        let client =
            FortiManagerClient::connect(&config.provider.url, timeout, config.provider.insecure, &credentials).await?;

        let options = RequestOptions::default()
            .with_attempts(config.provider.max_attempts)
            .with_timeout(timeout);
        let dispatcher = ResourceDispatcher::new(Arc::new(client.clone()), options);

        Ok(Self {
            config,
            registry,
            state_store,
            client,
            dispatcher,
        })
    }

    fn reconciler(&self) -> Reconciler<'_, LocalStateStore> {
        Reconciler::new(&self.config, &self.registry, &self.state_store, &self.dispatcher)
    }

    /// Ends the FortiManager session.
    async fn close(&self) {
        if let Err(e) = self.client.logout().await {
            warn!("Logout failed: {e}");
        }
    }
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Loads `.env` and the configuration file with environment overrides.
fn load_config(config_path: Option<&PathBuf>) -> Result<(SyncConfig, PathBuf)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(config_dir(&config_file));
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    Ok((config, config_file))
}

/// Built-in descriptors plus the configuration's schema files.
fn build_registry(config: &SyncConfig) -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::with_builtins();
    for path in &config.schemas {
        let count = registry.load_file(path)?;
        debug!("Loaded {count} resource types from {}", path.display());
    }
    Ok(registry)
}

/// State store for the configuration; relative paths are taken from the
/// configuration file's directory.
fn state_store(config: &SyncConfig, config_file: &Path) -> LocalStateStore {
    let path = if config.state.path.is_relative() {
        config_dir(config_file).join(&config.state.path)
    } else {
        config.state.path.clone()
    };
    LocalStateStore::new(path)
}

fn config_dir(config_file: &Path) -> PathBuf {
    config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Asks for confirmation on stderr and reads the answer from stdin.
fn confirm(prompt: &str, expected: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case(expected))
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}
