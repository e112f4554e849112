// ABOUTME: CLI for PageRelay: runs one collection cycle against a page and manages relay settings.
// ABOUTME: Plays the browser's part: loads the page, relays page data, and applies injected HTML.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use pagerelay_boundary::{BackendRelay, SettingsStore};
use pagerelay_collector::dom::fetch_page;
use pagerelay_collector::listener::handle_message;
use pagerelay_collector::{CollectOutcome, ConfigSource, Page, PageCollector, PageData};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pagerelay")]
#[command(about = "Collect configured fields from a page and relay them to a backend")]
struct Args {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one collection cycle against a page
    Collect(CollectArgs),
    /// Show or change the stored backend URL
    Settings {
        /// Settings file (default: <config dir>/pagerelay/settings.json)
        #[arg(long = "settings", global = true)]
        settings: Option<PathBuf>,

        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(clap::Args, Debug)]
struct CollectArgs {
    /// Page URL; fetched when no --html is given and the URL is http(s)
    #[arg(long = "url")]
    url: String,

    /// HTML file holding the page document
    #[arg(long = "html")]
    html: Option<PathBuf>,

    /// Text the user has selected on the page
    #[arg(long = "selection")]
    selection: Option<String>,

    /// Configuration file path or http(s) URL ("builtin" for the bundled default)
    #[arg(long = "config", default_value = "config.json")]
    config: String,

    /// Backend URL; overrides the stored setting
    #[arg(long = "backend")]
    backend: Option<String>,

    /// Settings file (default: <config dir>/pagerelay/settings.json)
    #[arg(long = "settings")]
    settings: Option<PathBuf>,

    /// Output file path for the page data (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Write the document after applying injected HTML to this file
    #[arg(long = "injected")]
    injected: Option<PathBuf>,

    /// Output compact JSON instead of pretty
    #[arg(long = "compact", default_value_t = false)]
    compact: bool,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the stored settings as JSON
    Show,
    /// Store the backend URL
    SetBackend { url: String },
    /// Remove the stored backend URL
    Clear,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let result = match args.command {
        Command::Collect(collect) => run_collect(collect).await,
        Command::Settings { settings, action } => run_settings(settings, action).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn settings_store(path: Option<PathBuf>) -> Result<SettingsStore> {
    path.or_else(SettingsStore::default_location)
        .map(SettingsStore::open)
        .ok_or_else(|| anyhow!("no config directory on this platform, pass --settings"))
}

async fn run_settings(path: Option<PathBuf>, action: SettingsAction) -> Result<()> {
    let store = settings_store(path)?;
    match action {
        SettingsAction::Show => {
            let settings = store.load().await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::SetBackend { url } => {
            store.set_backend_url(&url).await?;
            info!(path = %store.path().display(), "backend URL saved");
        }
        SettingsAction::Clear => {
            store.clear().await?;
            info!(path = %store.path().display(), "backend URL cleared");
        }
    }
    Ok(())
}

async fn load_page(args: &CollectArgs, http: &reqwest::Client) -> Result<Page> {
    let page = if let Some(html_path) = &args.html {
        let bytes = fs::read(html_path)
            .with_context(|| format!("reading {}", html_path.display()))?;
        Page::from_bytes(args.url.clone(), &bytes, None)
    } else if args.url.starts_with("http://") || args.url.starts_with("https://") {
        fetch_page(http, &args.url).await?
    } else if args.url.starts_with("file://") {
        let path = url::Url::parse(&args.url)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .ok_or_else(|| anyhow!("not a local file URL: {}", args.url))?;
        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        Page::from_bytes(args.url.clone(), &bytes, None)
    } else {
        bail!("--html is required unless --url is an http(s) or file:// URL");
    };

    Ok(match &args.selection {
        Some(text) => page.with_selection(text.clone()),
        None => page,
    })
}

fn write_output(data: Option<&PageData>, path: Option<&Path>, compact: bool) -> Result<()> {
    let output = if compact {
        serde_json::to_string(&data)?
    } else {
        serde_json::to_string_pretty(&data)?
    };
    match path {
        Some(path) => fs::write(path, output).with_context(|| format!("writing {}", path.display())),
        None => {
            println!("{}", output);
            Ok(())
        }
    }
}

async fn run_collect(args: CollectArgs) -> Result<()> {
    let http = reqwest::Client::builder()
        .user_agent(format!("PageRelay/{}", env!("CARGO_PKG_VERSION")))
        .build()?;

    let collector = PageCollector::builder()
        .config_source(ConfigSource::from(args.config.as_str()))
        .http_client(http.clone())
        .build();
    let mut page = load_page(&args, &http).await?;

    let store = settings_store(args.settings.clone()).ok();
    let backend = match (&args.backend, &store) {
        (Some(url), _) => Some(BackendRelay::builder().backend_url(url.clone())),
        (None, Some(store)) => match store.backend_url().await {
            Ok(Some(_)) => Some(BackendRelay::builder().settings(store.clone())),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable settings");
                None
            }
        },
        (None, None) => None,
    };

    let Some(backend) = backend else {
        debug!("no backend configured, printing page data only");
        let data = collector.collect(&page).await;
        return write_output(data.as_ref(), args.output.as_deref(), args.compact);
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let relay = backend.http_client(http).build(tx);
    let outcome = collector.run(&page, &relay).await;
    drop(relay);

    let mut injected = 0usize;
    while let Some(message) = rx.recv().await {
        if handle_message(&mut page, &message).is_some() {
            injected += 1;
        }
    }
    if injected > 0 {
        info!(count = injected, "applied injected HTML");
    }

    if let Some(path) = &args.injected {
        fs::write(path, page.outer_html()).with_context(|| format!("writing {}", path.display()))?;
    }

    if let CollectOutcome::RelayFailed { .. } = outcome {
        warn!("page data was collected but not relayed");
    }
    write_output(outcome.data(), args.output.as_deref(), args.compact)
}
