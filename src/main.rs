use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use webp_batch::job::Settings;
use webp_batch::session::Session;
use webp_batch::worker::{CancelHandle, WorkerEvent};

#[derive(Parser)]
#[command(name = "webp-batch")]
#[command(author, version, about = "Convert JPEG, PNG, BMP, TIFF and GIF images to WebP")]
struct Cli {
    /// Images to convert
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Encoder quality (1-100)
    #[arg(short, long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Encode losslessly
    #[arg(long)]
    lossless: bool,

    /// Delete each source image once its WebP file is written
    #[arg(long)]
    delete_original: bool,

    /// Write outputs here instead of next to each source
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            quality: self.quality,
            lossless: self.lossless,
            keep_original: !self.delete_original,
            output_dir: self.output_dir.clone(),
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "webp_batch=debug".to_string()
        } else {
            "webp_batch=warn".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut session = Session::new(cli.settings());
    let queue = session.queue_mut()?;
    for path in &cli.files {
        if !queue.add(path) {
            tracing::warn!("Skipping {}: unsupported or already queued", path.display());
        }
    }
    if queue.is_empty() {
        bail!("none of the given files can be converted");
    }
    let total = queue.len() as u64;

    session.start().context("failed to start conversion")?;
    if let Some(cancel) = session.cancel_handle() {
        watch_ctrl_c(cancel);
    }

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {wide_msg}")?.progress_chars("=> "),
    );
    bar.set_message(format!("0/{total} files"));

    let mut processed = 0u64;
    let summary = session
        .wait(|event| match event {
            WorkerEvent::Converted(result) => {
                processed += 1;
                bar.println(result.to_string());
                bar.set_message(format!("{processed}/{total} files"));
            }
            WorkerEvent::Failed(error) => {
                processed += 1;
                bar.println(error.to_string());
                bar.set_message(format!("{processed}/{total} files"));
            }
            WorkerEvent::Progress(percent) => bar.set_position(u64::from(*percent)),
            WorkerEvent::Finished(_) => {}
        })
        .context("conversion did not run")?;

    if summary.cancelled {
        bar.abandon_with_message("cancelled");
    } else {
        bar.finish_with_message("done");
    }
    println!(
        "{} converted, {} failed, {} skipped",
        summary.converted,
        summary.failed,
        summary.skipped()
    );

    Ok(if summary.failed > 0 || summary.cancelled {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Cancels the batch on Ctrl+C; the current file still completes.
fn watch_ctrl_c(cancel: CancelHandle) {
    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                return;
            }
        };
        rt.block_on(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Ctrl+C received, stopping after the current file");
                    eprintln!("Stopping after the current file...");
                    cancel.cancel();
                }
                Err(e) => tracing::error!("Failed to install Ctrl+C handler: {}", e),
            }
        });
    });
}
