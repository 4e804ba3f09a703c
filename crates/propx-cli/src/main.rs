use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result, miette};
use propx_common::telemetry::{self, TelemetryConfig};
use propx_common::{ApiClient, Config, FileStore, HttpImageUploader, LegalKind, Session, UploadSite};
use propx_editor_core::{
    ContentEditor, EditorHost, EditorOutput, HeadingDescriptor, ImageFile, ImageUpload,
};

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "PropX - admin content tools", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config file (.toml or .json)
    #[arg(long, global = true, env = "PROPX_CONFIG")]
    config: Option<PathBuf>,

    /// Bearer token, overrides the one in the config file
    #[arg(long, global = true, env = "PROPX_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize an HTML document and give every heading an anchor id
    Normalize {
        file: PathBuf,

        /// Print the heading outline as JSON after the HTML
        #[arg(long)]
        headings: bool,
    },
    /// Print the heading outline of an HTML document as JSON
    Headings { file: PathBuf },
    /// Upload an image and print its URL
    Upload {
        image: PathBuf,

        /// Upload endpoint, overrides the configured one
        #[arg(long)]
        endpoint: Option<String>,

        /// Use the help-center upload endpoint
        #[arg(long)]
        help_center: bool,
    },
    /// Privacy policy and terms of service
    Legal {
        #[command(subcommand)]
        action: LegalAction,
    },
    /// Write a config file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum LegalAction {
    /// Print a legal document
    Get {
        /// privacy-policy or terms-of-service
        kind: LegalKind,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Normalize a local HTML file and publish it
    Save { kind: LegalKind, file: PathBuf },
}

/// Host for one-shot runs; nothing is live, so change callbacks are dropped.
struct Oneshot;

impl EditorHost for Oneshot {
    fn on_content_change(&mut self, _html: &str) {}

    fn on_headings_change(&mut self, _headings: &[HeadingDescriptor]) {}
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    telemetry::init(TelemetryConfig::from_env("propx"));

    let cli = Cli::parse();
    let store = FileStore::new(cli.config.clone().unwrap_or_else(default_config_path));

    match cli.command {
        Commands::Normalize { file, headings } => {
            let config = load_config(&store).await?;
            let output = normalize_file(&file, &config)?;
            println!("{}", output.html);
            if headings {
                print_headings(&output.headings)?;
            }
        }
        Commands::Headings { file } => {
            let config = load_config(&store).await?;
            let output = normalize_file(&file, &config)?;
            print_headings(&output.headings)?;
        }
        Commands::Upload {
            image,
            endpoint,
            help_center,
        } => {
            let config = load_config(&store).await?;
            let site = if help_center {
                UploadSite::HelpCenter
            } else {
                UploadSite::Blog
            };
            let endpoint = endpoint.unwrap_or_else(|| config.upload_url(site).to_owned());
            upload(api_client(&config, cli.token), endpoint, &image).await?;
        }
        Commands::Legal { action } => {
            let config = load_config(&store).await?;
            let client = api_client(&config, cli.token);
            match action {
                LegalAction::Get { kind, out } => {
                    let content = client.legal_document(kind).await?;
                    match out {
                        Some(path) => std::fs::write(&path, content).into_diagnostic()?,
                        None => println!("{content}"),
                    }
                }
                LegalAction::Save { kind, file } => {
                    let output = normalize_file(&file, &config)?;
                    client.save_legal_document(kind, &output.html).await?;
                    println!("{} saved successfully", kind.title());
                }
            }
        }
        Commands::InitConfig { force } => init_config(&store, force).await?,
    }

    Ok(())
}

fn api_client(config: &Config, token: Option<String>) -> ApiClient {
    let session = Session::with_unauthorized_hook(token.or_else(|| config.token.clone()), || {
        eprintln!("Session expired. Set PROPX_TOKEN or update the token in your config.");
    });
    ApiClient::new(config.api_base_url.clone(), session)
}

fn normalize_file(path: &Path, config: &Config) -> Result<EditorOutput> {
    let html = std::fs::read_to_string(path)
        .into_diagnostic()
        .map_err(|e| e.wrap_err(format!("reading {}", path.display())))?;
    let editor = ContentEditor::from_html(&html, Oneshot, config.editor.clone());
    Ok(editor.snapshot())
}

fn print_headings(headings: &[HeadingDescriptor]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(headings).into_diagnostic()?);
    Ok(())
}

async fn upload(client: ApiClient, endpoint: String, path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).into_diagnostic()?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| miette!("image path has no file name: {}", path.display()))?;

    let uploader = HttpImageUploader::new(client, endpoint);
    let url = uploader
        .upload(ImageFile::new(name, bytes))
        .await
        .map_err(|e| miette!("Failed to upload image: {e}"))?;
    println!("{url}");
    Ok(())
}

async fn load_config(store: &FileStore) -> Result<Config> {
    if store.exists() {
        Config::load(store).await
    } else {
        tracing::debug!(path = %store.path().display(), "no config file, using defaults");
        Ok(Config::default())
    }
}

async fn init_config(store: &FileStore, force: bool) -> Result<()> {
    if store.exists() && !force {
        return Err(miette!(
            "{} already exists (use --force to overwrite)",
            store.path().display()
        ));
    }
    Config::default().save(store).await?;
    println!("Config written to {}", store.path().display());
    Ok(())
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("propx")
        .join("config.toml")
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .ok();
    miette::set_panic_hook();
}
