use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use warden::client::HttpClient;

#[derive(Parser)]
#[command(name = "warden-fetch")]
#[command(about = "Client and load generator for the warden file server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one URL; print HTML, save PDFs and images
    Get {
        /// e.g. http://localhost:8080/docs/paper.pdf
        url: String,

        /// Where downloads are written
        #[arg(short, long, default_value = ".")]
        download_dir: PathBuf,

        /// Connect over TLS even when the URL says http://
        #[arg(long)]
        https: bool,
    },
    /// Fire a fixed number of concurrent GETs every second and tally statuses
    Burst {
        #[arg(default_value = "http://localhost:8080/")]
        url: String,

        /// Requests per second
        #[arg(short, long, default_value_t = 4)]
        rps: usize,

        /// Number of seconds to run
        #[arg(short, long, default_value_t = 5)]
        seconds: u32,
    },
}

#[derive(Default)]
struct Tally {
    ok: usize,
    too_many: usize,
    other: Vec<u16>,
    errors: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Get {
            url,
            download_dir,
            https,
        } => {
            let url = if https { force_https(&url)? } else { url };
            get(&url, download_dir).await
        }
        Commands::Burst { url, rps, seconds } => burst(&url, rps, seconds).await,
    }
}

/// Rewrites an `http://` URL to `https://`, keeping any explicit port.
fn force_https(raw: &str) -> anyhow::Result<String> {
    let mut url = url::Url::parse(raw)?;
    if url.scheme() == "http" {
        url.set_scheme("https")
            .map_err(|_| anyhow::anyhow!("cannot switch {} to https", raw))?;
    }
    Ok(url.to_string())
}

async fn get(url: &str, download_dir: PathBuf) -> anyhow::Result<()> {
    let (client, target) = HttpClient::for_url(url)?;
    let response = client.get(&target).await?;

    let content_type = response.header("Content-Type").unwrap_or_default().to_string();
    println!("Status: {}", response.status);
    println!("Content-Type: {}", content_type);

    if content_type.contains("html") {
        println!("{}", String::from_utf8_lossy(&response.body));
    } else if content_type.starts_with("image/") || content_type.contains("pdf") {
        let name = target
            .split('?')
            .next()
            .and_then(|p| p.rsplit('/').next())
            .map(|n| urlencoding::decode(n).map(|d| d.into_owned()).unwrap_or_else(|_| n.to_string()))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "downloaded_file".to_string());

        tokio::fs::create_dir_all(&download_dir).await?;
        let save_path = download_dir.join(name);
        tokio::fs::write(&save_path, &response.body).await?;
        println!("Downloaded to: {}", save_path.display());
    } else {
        println!("Unknown file type: {}", content_type);
    }

    Ok(())
}

async fn burst(url: &str, rps: usize, seconds: u32) -> anyhow::Result<()> {
    let (client, target) = HttpClient::for_url(url)?;
    println!("Running test: {} requests/sec for {} seconds", rps, seconds);

    for second in 1..=seconds {
        let started = Instant::now();
        let tally = Arc::new(Mutex::new(Tally::default()));

        let mut handles = Vec::with_capacity(rps);
        for _ in 0..rps {
            let client = client.clone();
            let target = target.clone();
            let tally = Arc::clone(&tally);

            handles.push(tokio::spawn(async move {
                let outcome = client.get(&target).await;
                let mut tally = tally.lock().await;
                match outcome {
                    Ok(r) if r.status.as_u16() == 200 => tally.ok += 1,
                    Ok(r) if r.status.as_u16() == 429 => tally.too_many += 1,
                    Ok(r) => tally.other.push(r.status.as_u16()),
                    Err(e) => tally.errors.push(e.to_string()),
                }
            }));
        }
        for handle in handles {
            handle.await?;
        }

        let tally = tally.lock().await;
        println!(
            "Second {}: 200={} | 429={} | other={:?} | errors={}",
            second,
            tally.ok,
            tally.too_many,
            tally.other,
            tally.errors.len()
        );
        drop(tally);

        if let Some(rest) = Duration::from_secs(1).checked_sub(started.elapsed()) {
            tokio::time::sleep(rest).await;
        }
    }

    Ok(())
}
