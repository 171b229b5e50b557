use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_intake::config::UploadConfig;
use file_intake::intake::{FileSource, FileUpload, FileUploadOptions};
use file_intake::store::FileHandle;
use file_intake::upload::LocalUploader;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "file-intake starting");

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        anyhow::bail!("usage: file-intake <file>...");
    }

    // Load intake constraints
    let config = UploadConfig::from_env()?;
    info!(
        accept = ?config.accept,
        max_files = ?config.max_files,
        max_size = ?config.max_size,
        "Loaded configuration"
    );

    // Destination for the local transport
    let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
    let uploader = LocalUploader::new(&upload_dir)?;
    info!("Uploading to: {}", upload_dir);

    let pipeline = FileUpload::new(FileUploadOptions {
        config,
        uploader: Some(Arc::new(uploader)),
        ..FileUploadOptions::default()
    });

    // Print each file's status as transitions land
    let _subscription = pipeline.store().subscribe(|state| {
        for record in &state.files {
            println!("  {} - {}", record.file.name(), record.status_line());
        }
    });

    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        files.push(FileHandle::from_path(path).await?);
    }

    let intake = pipeline.submit(FileSource::Picker(files));
    info!(
        accepted = intake.accepted.len(),
        rejected = intake.rejected.len(),
        "Screened batch"
    );

    if let Some(upload) = intake.upload {
        upload.await?;
    }

    println!("{}", serde_json::to_string_pretty(&pipeline.views())?);

    Ok(())
}
