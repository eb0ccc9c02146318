mod batch_upload;
mod config;
mod database;
mod entities;
mod http_server;
mod logging;
mod seed;
mod services;
mod storage;
mod upload_files;

#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};
use url::Url;

use crate::{
    batch_upload::BatchUploadOptions,
    config::{Config, StorageOverrides},
    database::Database,
    http_server::app::HttpServerConfig,
    logging::{SERVICE_NAME, init_tracing, shutdown_tracing},
    storage::{ObjectStorage, S3Storage},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "MODEL_GALLERY_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, in RUST_LOG syntax
    #[arg(long, default_value = "info", global = true, env = "RUST_LOG")]
    log_level: String,

    /// OTLP collector to export traces to, e.g. http://localhost:4317
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

fn is_file(s: &str) -> Result<PathBuf, String> {
    let p: PathBuf = s.into();
    if p.is_file() {
        Ok(p)
    } else {
        Err(format!("`{}` is not an existing file", s))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// The port to run the server on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Public origin of the web client (used for CORS)
        #[arg(long, env = "BASE_URL")]
        base_url: Option<String>,

        /// Bucket holding uploaded objects
        #[arg(long, env = "AWS_BUCKET_NAME")]
        bucket: Option<String>,

        #[arg(long, env = "AWS_REGION")]
        region: Option<String>,

        #[arg(long, env = "AWS_ACCESS_KEY_ID")]
        access_key_id: Option<String>,

        #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
        secret_access_key: Option<String>,
    },
    /// Upload images through a running server and print the committed list as JSON
    Upload {
        /// Server to upload to
        #[arg(short, long, default_value = "http://localhost:3000/", env = "MODEL_GALLERY_SERVER")]
        server: Url,

        /// Key prefix for the uploaded objects
        #[arg(long, default_value = "batch")]
        prefix: String,

        /// Most images accepted in one run
        #[arg(long, default_value_t = 10)]
        max_files: usize,

        /// Largest accepted image, in megabytes
        #[arg(long, default_value_t = 10)]
        max_file_size_mb: u64,

        /// The images to upload
        #[arg(required = true, value_parser = is_file)]
        files: Vec<PathBuf>,
    },
    /// Insert sample models into an empty catalog
    Seed,
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let tracer_provider = init_tracing(
        SERVICE_NAME,
        args.otlp_endpoint.as_deref(),
        &args.log_level,
    )?;

    let result = run(args).await;
    shutdown_tracing(tracer_provider);
    result
}

async fn run(args: Args) -> Result<()> {
    log::debug!("Loading configuration");
    let mut config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .with_context(|| "Failed to load model-gallery config")?;

    match args.command {
        Commands::Serve {
            port,
            base_url,
            bucket,
            region,
            access_key_id,
            secret_access_key,
        } => {
            config.apply_overrides(StorageOverrides {
                bucket,
                region,
                access_key_id,
                secret_access_key,
                base_url,
            });

            // Default the web origin in debug mode, require it in release mode
            let base_url = if let Some(url) = config.server.base_url.clone() {
                url
            } else if cfg!(debug_assertions) {
                "http://localhost:3001".to_string()
            } else {
                return Err(color_eyre::eyre::eyre!(
                    "BASE_URL is required in release mode. Set it via --base-url, BASE_URL or the config file"
                ));
            };

            log::debug!("Opening database at: {}", config.database_path().display());
            let database = Database::open(&config.database_path()).await?;
            let storage: Arc<dyn ObjectStorage> = Arc::new(S3Storage::new(&config.storage).await);

            let port = port.unwrap_or(config.server.port);
            log::info!("Starting HTTP server on port: {}", port);
            http_server::app::start(HttpServerConfig {
                port,
                database,
                storage,
                config,
                base_url,
            })
            .await?;
        }
        Commands::Upload {
            server,
            prefix,
            max_files,
            max_file_size_mb,
            files,
        } => {
            let options = BatchUploadOptions {
                max_files,
                max_file_size_mb,
                prefix,
                schedule_delay: Duration::from_millis(100),
            };
            let committed = upload_files::upload_files(&server, &files, options).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&committed)
                    .wrap_err("Failed to serialize uploaded images")?
            );
        }
        Commands::Seed => {
            log::debug!("Opening database at: {}", config.database_path().display());
            let database = Arc::new(Database::open(&config.database_path()).await?);
            let created = seed::seed_models(database).await?;
            println!("Created {created} models");
        }
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                log::debug!("Creating default config");
                let path = Config::create_default()?;
                log::info!("Default config at {}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
    }

    Ok(())
}
