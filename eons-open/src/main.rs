//! Command-line interface for the eons-open binary.
//!
//! The CLI resolves the workspace link a page would receive and manages the
//! stored workspace template outside the browser.

use std::{
    io,
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use clap::{ArgAction, Args, Parser, Subcommand};
use eons_open::{
    ConfigStore, ContributionRegistry, EngineSettings, Error, FileBackend, TEMPLATE_KEY,
    TemplateContext, UrlNormalizer, VirtualDocument, load_settings, render_or_fallback,
    validate_template,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Command line interface for resolving workspace links.
#[derive(Debug, Parser,)]
#[command(name = "eons-open", version, about = "Resolve workspace links for repository pages")]
struct Cli
{
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand,)]
/// Supported commands exposed by the CLI.
enum Command
{
    /// Resolve the workspace link for a page URL.
    Resolve(ResolveArgs,),
    /// Inspect or change the stored workspace template.
    Template(TemplateArgs,),
}

#[derive(Debug, Args,)]
struct ResolveArgs
{
    /// Page URL to resolve.
    #[arg(long = "url", value_name = "URL")]
    url: String,

    /// JSON file holding the stored template.
    #[arg(long = "store", value_name = "PATH", env = "EONS_OPEN_STORE")]
    store: Option<PathBuf,>,

    /// YAML file with engine settings.
    #[arg(long = "settings", value_name = "PATH")]
    settings: Option<PathBuf,>,

    /// Output formatted JSON for easier inspection.
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pretty: bool,
}

#[derive(Debug, Args,)]
struct TemplateArgs
{
    #[command(subcommand)]
    command: TemplateCommand,
}

#[derive(Debug, Subcommand,)]
enum TemplateCommand
{
    /// Print the effective workspace template.
    Get(StoreArgs,),
    /// Validate and store a workspace template.
    Set
    {
        /// Template to store.
        value: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Check a template without storing it.
    Validate
    {
        /// Template to check.
        value: String,
    },
}

#[derive(Debug, Args,)]
struct StoreArgs
{
    /// JSON file holding the stored template.
    #[arg(long = "store", value_name = "PATH", env = "EONS_OPEN_STORE")]
    store: PathBuf,
}

/// Workspace link resolved for a page.
#[derive(Debug, Serialize,)]
struct Resolution
{
    url:           String,
    suitable:      bool,
    canonical_url: String,
    branch_name:   Option<String,>,
    workspace_url: String,
    contributions: Vec<String,>,
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn",),),)
        .with_writer(io::stderr,)
        .init();

    if let Err(error,) = run().await {
        eprintln!("{}", error.to_display_string());
        process::exit(1,);
    }
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates errors from settings loading, template validation, storage
/// access and serialization.
async fn run() -> Result<(), Error,>
{
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match cli.command {
        Command::Resolve(args,) => {
            let resolution = resolve(&args,).await?;
            write_json(&mut handle, &resolution, args.pretty,)
        }
        Command::Template(args,) => run_template(args.command, &mut handle,).await,
    }
}

fn config_store(path: &Path,) -> ConfigStore
{
    ConfigStore::new(Arc::new(FileBackend::new(path,),),)
}

/// Resolves the workspace link for `args.url`.
///
/// The page has no DOM, so merge-request branch lookups run until the poll
/// timeout and resolve to the project URL.
async fn resolve(args: &ResolveArgs,) -> Result<Resolution, Error,>
{
    let settings = match args.settings.as_deref() {
        Some(path,) => load_settings(path,)?,
        None => EngineSettings::default(),
    };
    let store = args.store.as_deref().map(config_store,).unwrap_or_else(ConfigStore::unavailable,);
    let registry = ContributionRegistry::builtin();

    let document = VirtualDocument::new(args.url.as_str(),);
    let normalized = UrlNormalizer::new(settings.branch_poll(),).normalize(&args.url, &document,).await;
    let template = store.workspace_template().await;
    let context = TemplateContext::new(normalized.canonical_url.as_str(), normalized.branch_name.clone(),);

    Ok(Resolution {
        url:           args.url.clone(),
        suitable:      registry.is_site_suitable(&args.url,),
        workspace_url: render_or_fallback(&template, &context,),
        canonical_url: normalized.canonical_url,
        branch_name:   normalized.branch_name,
        contributions: registry.matching(&args.url,).map(|contribution| contribution.id.clone(),).collect(),
    },)
}

async fn run_template<W: io::Write,>(command: TemplateCommand, writer: &mut W,) -> Result<(), Error,>
{
    match command {
        TemplateCommand::Get(args,) => {
            let template = config_store(&args.store,).workspace_template().await;
            writeln!(writer, "{template}").map_err(|source| eons_open::io_error(&args.store, source,),)?;
        }
        TemplateCommand::Set {
            value,
            store,
        } => {
            config_store(&store.store,).set(TEMPLATE_KEY, &value,).await?;
        }
        TemplateCommand::Validate {
            value,
        } => {
            validate_template(&value,)?;
            writeln!(writer, "ok").map_err(|source| eons_open::io_error(Path::new("<stdout>",), source,),)?;
        }
    }
    Ok((),)
}

fn write_json<W: io::Write, T: Serialize,>(writer: &mut W, value: &T, pretty: bool,) -> Result<(), Error,>
{
    if pretty {
        serde_json::to_writer_pretty(writer, value,)?;
    } else {
        serde_json::to_writer(writer, value,)?;
    }

    Ok((),)
}
