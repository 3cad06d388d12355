//! Per-clip featurization benchmark on synthetic audio.
//!
//! Measures wall-clock time per clip and real-time factor for a few source
//! rates, channel counts and lengths.
//!
//! Usage:
//! ```sh
//! cargo bench --features cli --bench featurize_bench -- --iterations 10
//!
//! # With JSON output:
//! cargo bench --features cli --bench featurize_bench -- --json-output results.json
//! ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::f32::consts::PI;
use std::time::Instant;

use soundclip_features::{AudioSignal, FeaturePipeline, PipelineConfig, ResampleQuality};

// ── CLI ──────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "featurize_bench", about = "Feature pipeline benchmark")]
struct Args {
    /// Number of warmup runs (not measured)
    #[arg(long, default_value_t = 2)]
    warmup: usize,

    /// Number of timed iterations (results are averaged)
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Random seed for reproducible augmentation
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Resampler preset
    #[arg(long, value_enum, default_value_t = Quality::Normal)]
    quality: Quality,

    /// Write JSON results to this path
    #[arg(long)]
    json_output: Option<String>,

    // Passed by `cargo bench`
    #[arg(long, hide = true)]
    bench: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Quality {
    Fast,
    Normal,
    High,
}

impl From<Quality> for ResampleQuality {
    fn from(quality: Quality) -> Self {
        match quality {
            Quality::Fast => ResampleQuality::Fast,
            Quality::Normal => ResampleQuality::Normal,
            Quality::High => ResampleQuality::High,
        }
    }
}

// ── Result types ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
struct BenchmarkResult {
    label: String,
    source_rate: u32,
    source_channels: usize,
    source_secs: f32,
    wall_clock_ms: f64,
    /// Wall-clock / output clip duration. Lower = faster.
    rtf: f64,
    output_shape: (usize, usize, usize),
}

#[derive(Debug, Serialize)]
struct BenchmarkReport {
    quality: ResampleQuality,
    iterations: usize,
    results: Vec<BenchmarkResult>,
}

// ── Test corpus ──────────────────────────────────────────────────────────

fn test_corpus() -> Vec<(&'static str, u32, usize, f32)> {
    vec![
        ("native", 44100, 2, 4.0),
        ("mono22k", 22050, 1, 2.0),
        ("long48k", 48000, 2, 6.0),
        ("short8k", 8000, 1, 0.5),
    ]
}

fn synth(sample_rate: u32, channels: usize, secs: f32) -> AudioSignal {
    let len = (sample_rate as f32 * secs) as usize;
    let data = (0..channels)
        .map(|ch| {
            let freq = 220.0 * (ch + 1) as f32;
            (0..len)
                .map(|i| {
                    let t = i as f32 / sample_rate as f32;
                    0.4 * (2.0 * PI * freq * t).sin() + 0.1 * (2.0 * PI * 3000.0 * t).sin()
                })
                .collect()
        })
        .collect();
    AudioSignal::new(data, sample_rate)
}

// ── Benchmark runner ─────────────────────────────────────────────────────

fn run_benchmark(
    pipeline: &FeaturePipeline,
    label: &str,
    (rate, channels, secs): (u32, usize, f32),
    args: &Args,
) -> Result<BenchmarkResult> {
    let signal = synth(rate, channels, secs);
    let mut rng = StdRng::seed_from_u64(args.seed);

    for _ in 0..args.warmup {
        pipeline.process(signal.clone(), &mut rng)?;
    }

    let mut wall_times = Vec::with_capacity(args.iterations);
    let mut output_shape = (0, 0, 0);
    for _ in 0..args.iterations {
        let input = signal.clone();
        let start = Instant::now();
        let spec = pipeline.process(input, &mut rng)?;
        wall_times.push(start.elapsed().as_secs_f64() * 1000.0);
        output_shape = spec.shape();
    }

    let avg_wall_ms = wall_times.iter().sum::<f64>() / wall_times.len().max(1) as f64;
    let clip_secs = pipeline.config().target_duration_ms as f64 / 1000.0;

    Ok(BenchmarkResult {
        label: label.to_string(),
        source_rate: rate,
        source_channels: channels,
        source_secs: secs,
        wall_clock_ms: avg_wall_ms,
        rtf: avg_wall_ms / 1000.0 / clip_secs,
        output_shape,
    })
}

// ── Table formatting ─────────────────────────────────────────────────────

fn print_table(results: &[BenchmarkResult]) {
    println!();
    println!(
        "{:<8} {:>7} {:>4} {:>8} {:>10} {:>8} {:>16}",
        "Label", "Rate", "Ch", "Src (s)", "Wall (ms)", "RTF", "Shape"
    );
    println!("{}", "-".repeat(66));

    for r in results {
        println!(
            "{:<8} {:>7} {:>4} {:>8.2} {:>10.2} {:>8.4} {:>16}",
            r.label,
            r.source_rate,
            r.source_channels,
            r.source_secs,
            r.wall_clock_ms,
            r.rtf,
            format!("{:?}", r.output_shape),
        );
    }
    println!();
}

// ── Main ─────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = PipelineConfig {
        resample_quality: args.quality.into(),
        ..Default::default()
    };
    println!(
        "Config: {} warmup, {} iterations, seed {}, quality {:?}",
        args.warmup, args.iterations, args.seed, args.quality
    );

    let pipeline = FeaturePipeline::new(config)?;
    let corpus = test_corpus();
    let mut results = Vec::with_capacity(corpus.len());

    for (label, rate, channels, secs) in corpus {
        print!("Benchmarking [{label}]...");
        std::io::Write::flush(&mut std::io::stdout())?;
        let result = run_benchmark(&pipeline, label, (rate, channels, secs), &args)?;
        println!(" {:.2}ms (RTF={:.4})", result.wall_clock_ms, result.rtf);
        results.push(result);
    }

    print_table(&results);

    if let Some(ref path) = args.json_output {
        let report = BenchmarkReport {
            quality: args.quality.into(),
            iterations: args.iterations,
            results: results.clone(),
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, &json)?;
        println!("JSON results written to {path}");
    }

    Ok(())
}
