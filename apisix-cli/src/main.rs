//! APISIX declarative CLI

use anyhow::{bail, Context, Result};
use apisix_config::{load_and_merge, Document, ProviderBlock};
use apisix_provider::{ApisixProvider, Engine, State, DEFAULT_STATE_FILE};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde_json::json;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "apisix-tf")]
#[command(about = "Manage Apache APISIX declaratively", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the state file
    #[arg(long, global = true, env = "APISIX_STATE", default_value = DEFAULT_STATE_FILE)]
    state: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "APISIX_LOG", default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate documents
    Validate {
        /// Documents, merged in order. Repeat to layer several.
        #[arg(short, long, default_value = "apisix.yaml")]
        config: Vec<PathBuf>,
    },

    /// Show the changes needed to match the documents
    Plan {
        /// Documents, merged in order. Repeat to layer several.
        #[arg(short, long, default_value = "apisix.yaml")]
        config: Vec<PathBuf>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply the changes needed to match the documents
    Apply {
        /// Documents, merged in order. Repeat to layer several.
        #[arg(short, long, default_value = "apisix.yaml")]
        config: Vec<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },

    /// Delete every managed object
    Destroy {
        /// Documents providing the provider settings
        #[arg(short, long)]
        config: Vec<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(long)]
        auto_approve: bool,
    },

    /// Read managed objects back from APISIX
    Refresh {
        /// Documents providing the provider settings
        #[arg(short, long)]
        config: Vec<PathBuf>,
    },

    /// Bring an existing object under management
    Import {
        /// Documents, merged in order. Repeat to layer several.
        #[arg(short, long, default_value = "apisix.yaml")]
        config: Vec<PathBuf>,

        /// Resource address, such as apisix_route.api
        address: String,

        /// Identifier of the object in APISIX
        id: String,
    },

    /// Inspect or edit the state
    State {
        #[command(subcommand)]
        command: StateCommands,
    },

    /// Print the provider, resource and data source schemas as JSON
    Schema {
        /// Only this resource or data source type
        #[arg(long = "type")]
        type_name: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum StateCommands {
    /// List managed resources
    List,

    /// Show the state of a resource, sensitive values redacted
    Show {
        /// Resource address
        address: String,
    },

    /// Forget a resource without deleting the object
    Rm {
        /// Resource address
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Validate { config } => {
            let document = load_and_merge(&config)?;
            let engine = engine_for(&document.provider, false)?;
            let mut errors = 0;
            for resource in &document.resources {
                let Some(handler) = engine.provider().resource(&resource.resource_type) else {
                    bail!("{}: unknown resource type", resource.address());
                };
                let diags = handler.validate(&serde_json::Value::Object(resource.config.clone()));
                for diagnostic in diags.iter() {
                    eprintln!("{}: {diagnostic}", resource.address());
                }
                errors += diags.error_count();
            }
            if errors > 0 {
                bail!("{errors} error(s) found");
            }
            println!(
                "Success! {} resources and {} data sources are valid.",
                document.resources.len(),
                document.data.len()
            );
            Ok(())
        }

        Commands::Plan { config, json } => {
            let document = load_and_merge(&config)?;
            let engine = engine_for(&document.provider, true)?;
            let state = State::load(&cli.state)?;
            let plan = engine.plan(&document, &state).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print!("{}", engine.render(&plan));
            }
            Ok(())
        }

        Commands::Apply {
            config,
            auto_approve,
        } => {
            let document = load_and_merge(&config)?;
            let engine = engine_for(&document.provider, true)?;
            let mut state = State::load(&cli.state)?;
            let plan = engine.plan(&document, &state).await?;
            print!("{}", engine.render(&plan));
            if !plan.has_changes() {
                return Ok(());
            }
            if !auto_approve && !confirm("Apply these changes?")? {
                println!("Apply cancelled.");
                return Ok(());
            }
            let counts = engine.apply(&plan, &mut state, Some(&cli.state)).await?;
            println!("Apply complete! Resources: {counts}.");
            Ok(())
        }

        Commands::Destroy {
            config,
            auto_approve,
        } => {
            let provider = provider_block(&config)?;
            let engine = engine_for(&provider, true)?;
            let mut state = State::load(&cli.state)?;
            let plan = engine.plan_destroy(&state);
            print!("{}", engine.render(&plan));
            if !plan.has_changes() {
                return Ok(());
            }
            if !auto_approve && !confirm("Destroy every managed object?")? {
                println!("Destroy cancelled.");
                return Ok(());
            }
            let counts = engine.destroy(&mut state, Some(&cli.state)).await?;
            println!("Destroy complete! Resources: {} destroyed.", counts.destroy);
            Ok(())
        }

        Commands::Refresh { config } => {
            let provider = provider_block(&config)?;
            let engine = engine_for(&provider, true)?;
            let mut state = State::load(&cli.state)?;
            let summary = engine.refresh(&mut state, Some(&cli.state)).await?;
            println!(
                "Refreshed {} resources, {} no longer exist.",
                summary.refreshed, summary.removed
            );
            Ok(())
        }

        Commands::Import {
            config,
            address,
            id,
        } => {
            let document = load_and_merge(&config)?;
            let engine = engine_for(&document.provider, true)?;
            let mut state = State::load(&cli.state)?;
            engine
                .import(&document, &mut state, &address, &id, Some(&cli.state))
                .await?;
            println!("Import successful! {address} now manages {id}.");
            Ok(())
        }

        Commands::State { command } => run_state(command, &cli.state),

        Commands::Schema { type_name } => {
            println!("{}", serde_json::to_string_pretty(&schemas(type_name.as_deref())?)?);
            Ok(())
        }

        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "apisix-tf", &mut io::stdout());
            Ok(())
        }

        Commands::Version => {
            println!("apisix-tf");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

fn run_state(command: StateCommands, path: &Path) -> Result<()> {
    let mut state = State::load(path)?;
    match command {
        StateCommands::List => {
            for address in state.resources.keys() {
                println!("{address}");
            }
        }
        StateCommands::Show { address } => {
            let resource = state
                .get(&address)
                .with_context(|| format!("{address} is not in the state"))?;
            let attributes = match ApisixProvider::new().resource(&resource.resource_type) {
                Some(handler) => handler.schema().redact(&resource.attributes),
                None => resource.attributes.clone(),
            };
            let shown = json!({
                "address": address,
                "id": resource.id,
                "attributes": attributes,
                "dependencies": resource.dependencies,
            });
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        StateCommands::Rm { address } => {
            if state.remove(&address).is_none() {
                bail!("{address} is not in the state");
            }
            state.save(path)?;
            println!("Removed {address}, the object itself was left in APISIX.");
        }
    }
    Ok(())
}

/// Configured engine. With `require_client` a missing endpoint is an error.
fn engine_for(block: &ProviderBlock, require_client: bool) -> Result<Engine> {
    let mut provider = ApisixProvider::new();
    let diags = provider.configure(block);
    for diagnostic in diags.iter() {
        tracing::warn!("{diagnostic}");
    }
    if diags.has_error() {
        bail!("{diags}");
    }
    if require_client && !provider.is_configured() {
        bail!("no APISIX endpoint configured, set `provider.endpoint` or APISIX_ENDPOINT");
    }
    Ok(Engine::new(provider)?)
}

fn provider_block(config: &[PathBuf]) -> Result<ProviderBlock> {
    if config.is_empty() {
        return Ok(ProviderBlock::default());
    }
    let document: Document = load_and_merge(config)?;
    Ok(document.provider)
}

fn schemas(type_name: Option<&str>) -> Result<serde_json::Value> {
    let provider = ApisixProvider::new();
    let resources = provider.resources();
    let data_sources = provider.data_sources();

    if let Some(type_name) = type_name {
        let resource = resources.get(type_name).map(|r| r.schema().describe());
        let data_source = data_sources.get(type_name).map(|d| d.schema().describe());
        if resource.is_none() && data_source.is_none() {
            bail!("unknown type {type_name}");
        }
        return Ok(json!({
            "resource_schema": resource,
            "data_source_schema": data_source,
        }));
    }

    let resource_schemas: serde_json::Map<String, serde_json::Value> = resources
        .iter()
        .map(|(name, r)| (name.to_string(), r.schema().describe()))
        .collect();
    let data_source_schemas: serde_json::Map<String, serde_json::Value> = data_sources
        .iter()
        .map(|(name, d)| (name.to_string(), d.schema().describe()))
        .collect();
    Ok(json!({
        "provider": ApisixProvider::schema().describe(),
        "resource_schemas": resource_schemas,
        "data_source_schemas": data_source_schemas,
    }))
}

fn confirm(question: &str) -> Result<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "{question} Only 'yes' will be accepted: ")?;
    stderr.flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim() == "yes")
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log level")?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(io::stderr),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr),
            )
            .init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "apisix-tf",
            "plan",
            "-c",
            "base.yaml",
            "-c",
            "prod.yaml",
            "--state",
            "prod.tfstate",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.state, PathBuf::from("prod.tfstate"));
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Plan { config, json } => {
                assert_eq!(config, vec![PathBuf::from("base.yaml"), PathBuf::from("prod.yaml")]);
                assert!(!json);
            }
            _ => panic!("expected plan"),
        }
    }

    #[test]
    fn test_schemas() {
        let all = schemas(None).unwrap();
        assert!(all["resource_schemas"]["apisix_route"].is_object());
        assert!(all["data_source_schemas"]["apisix_upstream"].is_object());

        let route = schemas(Some("apisix_route")).unwrap();
        assert!(route["resource_schema"].is_object());
        assert!(route["data_source_schema"].is_object());
        assert!(schemas(Some("apisix_plugin")).is_err());
    }

    #[test]
    fn test_state_rm() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_STATE_FILE);
        let mut state = State::new();
        state.insert(
            "apisix_consumer.jack",
            apisix_provider::ResourceState::new(
                "apisix_consumer",
                "jack",
                Some("jack".to_string()),
                json!({"username": "jack"}),
            ),
        );
        state.save(&path).unwrap();

        run_state(
            StateCommands::Rm {
                address: "apisix_consumer.jack".to_string(),
            },
            &path,
        )
        .unwrap();
        assert!(State::load(&path).unwrap().resources.is_empty());
        assert!(run_state(
            StateCommands::Rm {
                address: "apisix_consumer.jack".to_string()
            },
            &path
        )
        .is_err());
    }
}
