//! Featurize a labelled clip corpus and report what succeeded.
//!
//! Usage:
//! ```sh
//! cargo run --release --features cli --bin featurize -- \
//!     --metadata UrbanSound8K/metadata/UrbanSound8K.csv \
//!     --audio-root UrbanSound8K/audio --seed 42
//!
//! # With a pipeline config and JSON summary:
//! cargo run --release --features cli --bin featurize -- \
//!     --metadata meta.csv --audio-root audio --config pipeline.json \
//!     --json-output summary.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use soundclip_features::{
    FeatureError, FeaturePipeline, MetadataTable, PipelineConfig, SoundDataset,
};

// ── CLI ──────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "featurize", about = "Compute augmented log-mel features for a clip corpus")]
struct Args {
    /// Metadata CSV (slice_file_name, fold, classID columns)
    #[arg(long)]
    metadata: String,

    /// Audio root; each item's "/fold{N}/{file}" path is appended to it
    #[arg(long)]
    audio_root: String,

    /// Pipeline config JSON; defaults are used when omitted
    #[arg(long)]
    config: Option<String>,

    /// Base seed for per-item random streams
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Only process the first N items
    #[arg(long)]
    limit: Option<usize>,

    /// Worker threads (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Write a JSON summary to this path
    #[arg(long)]
    json_output: Option<String>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

// ── Summary types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Failure {
    index: usize,
    path: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct Summary {
    metadata: String,
    audio_root: String,
    seed: u64,
    config: PipelineConfig,
    output_shape: (usize, usize, usize),
    items: usize,
    succeeded: usize,
    failed: usize,
    elapsed_secs: f64,
    clips_per_sec: f64,
    /// Successful clips per class id
    class_counts: BTreeMap<u32, usize>,
    /// dB range over all successful features
    min_db: Option<f32>,
    max_db: Option<f32>,
    failures: Vec<Failure>,
}

fn describe(index: usize, err: &FeatureError) -> Failure {
    let path = match err {
        FeatureError::Item { path, .. } => path.clone(),
        _ => String::new(),
    };
    Failure {
        index,
        path,
        error: err.root_cause().to_string(),
    }
}

fn print_summary(summary: &Summary) {
    println!();
    println!("Items:      {}", summary.items);
    println!("Succeeded:  {}", summary.succeeded);
    println!("Failed:     {}", summary.failed);
    println!("Shape:      {:?}", summary.output_shape);
    println!(
        "Elapsed:    {:.2}s ({:.1} clips/s)",
        summary.elapsed_secs, summary.clips_per_sec
    );
    if let (Some(min), Some(max)) = (summary.min_db, summary.max_db) {
        println!("dB range:   [{min:.2}, {max:.2}]");
    }

    if !summary.class_counts.is_empty() {
        println!();
        println!("{:<8} {:>8}", "Class", "Clips");
        println!("{}", "-".repeat(17));
        for (class_id, count) in &summary.class_counts {
            println!("{class_id:<8} {count:>8}");
        }
    }
    println!();
}

// ── Main ─────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure worker threads")?;
    }

    let config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load pipeline config {path}"))?,
        None => PipelineConfig::default(),
    };
    let output_shape = config.output_shape();

    let mut table = MetadataTable::from_csv(&args.metadata)
        .with_context(|| format!("failed to read metadata {}", args.metadata))?;
    if let Some(limit) = args.limit {
        table.truncate(limit);
    }

    println!("Metadata:   {} ({} items)", args.metadata, table.len());
    println!("Audio root: {}", args.audio_root);
    println!("Seed:       {}", args.seed);
    println!("Threads:    {}", rayon::current_num_threads());

    let pipeline = FeaturePipeline::new(config.clone())?;
    let dataset = SoundDataset::new(table, args.audio_root.clone(), pipeline);

    let start = Instant::now();
    let results = dataset.featurize_all(args.seed);
    let elapsed_secs = start.elapsed().as_secs_f64();

    let mut class_counts = BTreeMap::new();
    let mut failures = Vec::new();
    let mut min_db: Option<f32> = None;
    let mut max_db: Option<f32> = None;

    for (index, result) in results.iter().enumerate() {
        match result {
            Ok((spec, class_id)) => {
                *class_counts.entry(*class_id).or_insert(0) += 1;
                min_db = Some(min_db.map_or(spec.min(), |m| m.min(spec.min())));
                max_db = Some(max_db.map_or(spec.max(), |m| m.max(spec.max())));
            }
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping item");
                failures.push(describe(index, err));
            }
        }
    }

    let items = results.len();
    let summary = Summary {
        metadata: args.metadata.clone(),
        audio_root: args.audio_root.clone(),
        seed: args.seed,
        config,
        output_shape,
        items,
        succeeded: items - failures.len(),
        failed: failures.len(),
        elapsed_secs,
        clips_per_sec: if elapsed_secs > 0.0 {
            items as f64 / elapsed_secs
        } else {
            0.0
        },
        class_counts,
        min_db,
        max_db,
        failures,
    };

    print_summary(&summary);

    if let Some(ref path) = args.json_output {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, &json).with_context(|| format!("failed to write {path}"))?;
        println!("JSON summary written to {path}");
    }

    Ok(())
}
