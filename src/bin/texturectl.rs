use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use texture_relay::cloudinary::BlobHost;
use texture_relay::error::{AppError, GenerateError};
use texture_relay::pipeline::{generate_hosted, generate_local};
use texture_relay::replicate::PredictionService;
use texture_relay::utils::TempUpload;
use texture_relay::{CloudinaryClient, Config, JobClient, LocalPredictor, PollPolicy, ReplicateClient};

#[derive(Parser, Debug)]
#[command(name = "texturectl", about = "CLI for the texture relay", version)]
struct Cli {
    /// Override REPLICATE_BASE_URL
    #[arg(global = true, long)]
    replicate_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Host an image and run a prediction on it until it finishes
    Generate {
        /// Image to upload
        #[arg(long, value_name = "PATH")]
        image: PathBuf,
        /// Prompt text (defaults to DEFAULT_PROMPT)
        #[arg(long)]
        prompt: Option<String>,
        /// Milliseconds between status polls
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Maximum number of status polls
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Fetch a prediction by id
    Status {
        id: String,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Check connectivity to Replicate and Cloudinary
    Ping,
    /// Run the local predictor script
    Local {
        /// Prompt text (defaults to DEFAULT_PROMPT)
        #[arg(long)]
        prompt: Option<String>,
        /// Optional init image
        #[arg(long, value_name = "PATH")]
        image: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load env and parse CLI
    Config::dotenv_load();
    let cli = Cli::parse();

    let mut conf = Config::new()?;
    if let Some(url) = cli.replicate_url {
        conf.replicate_base_url = url;
    }

    match cli.command {
        Commands::Generate {
            image,
            prompt,
            interval_ms,
            max_attempts,
        } => {
            let defaults = conf.poll_policy();
            let policy = PollPolicy::new(
                interval_ms.map(Duration::from_millis).unwrap_or(defaults.interval),
                max_attempts.unwrap_or(defaults.max_attempts),
            );
            let jobs = JobClient::new(Arc::new(ReplicateClient::new(conf.replicate()?)?), policy);
            let host = CloudinaryClient::new(conf.cloudinary()?)?;
            let upload = stage(&conf, &image).await?;
            let prompt = prompt.unwrap_or_else(|| conf.default_prompt.clone());

            match generate_hosted(&host, &jobs, upload, &prompt, &conf.cloudinary_folder).await {
                Ok(generated) => {
                    println!("{}", serde_json::to_string_pretty(&generated)?);
                    Ok(())
                }
                Err(e) => fail(e),
            }
        }
        Commands::Status { id, pretty } => {
            let client = ReplicateClient::new(conf.replicate()?)?;
            let job = client.get(&id).await.map_err(|e| {
                eprintln!("Error: {}", e);
                e
            })?;
            if pretty {
                println!("{}", serde_json::to_string_pretty(&job)?);
            } else {
                println!("{}", serde_json::to_string(&job)?);
            }
            Ok(())
        }
        Commands::Ping => {
            let mut healthy = true;
            match conf.replicate().and_then(ReplicateClient::new) {
                Ok(client) => match client.ping().await {
                    Ok(status) => println!("replicate: connected ({})", status),
                    Err(e) => {
                        healthy = false;
                        println!("replicate: failed: {}", e);
                    }
                },
                Err(e) => {
                    healthy = false;
                    println!("replicate: {}", e);
                }
            }
            match conf.cloudinary().and_then(CloudinaryClient::new) {
                Ok(client) => match client.ping().await {
                    Ok(result) => println!("cloudinary: connected {}", result),
                    Err(e) => {
                        healthy = false;
                        println!("cloudinary: failed: {}", e);
                    }
                },
                Err(e) => {
                    healthy = false;
                    println!("cloudinary: {}", e);
                }
            }
            if !healthy {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Local { prompt, image } => {
            let predictor = LocalPredictor::new(
                conf.python_candidates.clone(),
                conf.predictor_script.clone(),
                conf.output_dir.clone(),
            );
            // Hosting the result is optional here, same as in the server.
            let host: Option<Box<dyn BlobHost>> = conf
                .cloudinary()
                .and_then(CloudinaryClient::new)
                .ok()
                .map(|c| Box::new(c) as Box<dyn BlobHost>);
            let upload = match image {
                Some(path) => Some(stage(&conf, &path).await?),
                None => None,
            };
            let prompt = prompt.unwrap_or_else(|| conf.default_prompt.clone());

            match generate_local(&predictor, host.as_deref(), upload, &prompt).await {
                Ok(generated) => {
                    println!("{}", serde_json::to_string_pretty(&generated)?);
                    Ok(())
                }
                Err(e) => fail(e),
            }
        }
    }
}

/// Copy a user file into the upload dir so the pipeline can consume it.
async fn stage(conf: &Config, image: &Path) -> Result<TempUpload, AppError> {
    let bytes = tokio::fs::read(image).await?;
    let name = image.file_name().and_then(|n| n.to_str());
    TempUpload::persist(&conf.upload_dir, &bytes, name).await
}

fn fail(e: GenerateError) -> Result<(), Box<dyn std::error::Error>> {
    let mut body: Value = e.source.to_body();
    if let Some(url) = e.cloudinary_url {
        body["cloudinary_url"] = Value::String(url);
    }
    eprintln!("Error: {}", serde_json::to_string_pretty(&body)?);
    std::process::exit(1);
}
