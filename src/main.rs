use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::warn;

use meli_extractor::{cta, Audience, CtaStyle, Extractor, ProductRecord};

#[derive(Parser)]
#[command(name = "meli_extractor", about = "MercadoLivre product link resolver & extractor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a URL is an acceptable MercadoLivre link
    Validate { url: String },
    /// Extract the canonical item code from a URL (offline)
    Id { url: String },
    /// Resolve a shortened/affiliate link to a direct product URL
    Resolve { url: String },
    /// Extract the full normalized product record
    Extract {
        url: String,
        /// Print the record as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Extract a record and generate a WhatsApp CTA message for it
    Cta {
        url: String,
        /// Override audience detection (jovens, adultos, familia, tecnologia)
        #[arg(short, long)]
        audience: Option<String>,
        /// Override style detection (urgencia, beneficios, social, emocional)
        #[arg(short, long)]
        style: Option<String>,
    },
    /// Extract records for every URL in a file (one per line), as JSON lines
    Batch {
        file: PathBuf,
        /// Max URLs to process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Concurrent extractions
        #[arg(short, long, default_value = "4")]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { url } => {
            if meli_extractor::is_valid_link(&url) {
                println!("valid");
            } else {
                println!("invalid");
            }
            Ok(())
        }
        Commands::Id { url } => {
            match meli_extractor::extract_id(&url) {
                Some(id) => println!("{} ({:?})", id.code, id.confidence),
                None => println!("no id found"),
            }
            Ok(())
        }
        Commands::Resolve { url } => {
            let extractor = Extractor::new();
            let resolved = extractor.resolve(&url).await;
            if resolved == url {
                println!("(unchanged) {resolved}");
            } else {
                println!("{resolved}");
            }
            Ok(())
        }
        Commands::Extract { url, json } => {
            let extractor = Extractor::new();
            let record = extractor.extract_product_data(&url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_record(&record);
            }
            Ok(())
        }
        Commands::Cta { url, audience, style } => {
            let extractor = Extractor::new();
            let record = extractor.extract_product_data(&url).await?;

            let audience = match audience {
                Some(a) => a.parse::<Audience>().map_err(anyhow::Error::msg)?,
                None => cta::detect_audience(&record),
            };
            let style = match style {
                Some(s) => s.parse::<CtaStyle>().map_err(anyhow::Error::msg)?,
                None => cta::detect_best_cta_style(&record),
            };

            let message = cta::generate_cta(&record, audience, style);
            let link = cta::add_utm_params(&record.affiliate_link, &record, audience, style);
            println!("{message}\n\n{link}");
            Ok(())
        }
        Commands::Batch { file, limit, concurrency } => run_batch(file, limit, concurrency).await,
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Stream extraction over a URL file: workers behind a semaphore, results
/// printed as JSON lines the moment they arrive.
async fn run_batch(file: PathBuf, limit: Option<usize>, concurrency: usize) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .take(limit.unwrap_or(usize::MAX))
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        println!("No URLs in {}", file.display());
        return Ok(());
    }

    let extractor = Arc::new(Extractor::new());
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total = urls.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<(String, Result<ProductRecord, String>)>(
        concurrency.max(1) * 2,
    );

    for url in urls {
        let extractor = Arc::clone(&extractor);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let outcome = extractor
                .extract_product_data(&url)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send((url, outcome)).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut ok = 0usize;
    let mut errors = 0usize;
    while let Some((url, outcome)) = rx.recv().await {
        match outcome {
            Ok(record) => {
                ok += 1;
                match serde_json::to_string(&record) {
                    Ok(line) => pb.println(line),
                    Err(e) => warn!("cannot serialize record for {url}: {e}"),
                }
            }
            Err(e) => {
                errors += 1;
                warn!("{url}: {e}");
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    println!("Done: {total} processed ({ok} ok, {errors} errors).");
    Ok(())
}

fn print_record(record: &ProductRecord) {
    println!("Nome:      {}", record.name);
    match record.discount_price {
        Some(discount) => {
            println!("Preço:     R$ {:.2} (de R$ {:.2})", discount, record.original_price);
            println!("Desconto:  {:.0}%", record.discount_percent());
        }
        None => println!("Preço:     R$ {:.2}", record.original_price),
    }
    println!("Categoria: {}", record.category);
    println!("Avaliação: {:.1}/5 ({} avaliações)", record.rating, record.reviews);
    println!("Imagem:    {}", truncate(&record.image, 80));
    println!("Fonte:     {:?}", record.source);
    println!("Link:      {}", record.affiliate_link);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
