//! CLI entry point for phishnet.
//!
//! Subcommands:
//!   train-classical  -- Train the random forest on lexical URL features
//!   train-sequence   -- Train the character-level CNN
//!   classify         -- Classify URLs with a trained model

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use phishnet_core::{LabeledUrl, PhishnetError};
use phishnet_detect::artifacts::{self, ClassicalArtifact};
use phishnet_detect::decision::{UrlDetector, UrlScorer};
use phishnet_detect::device::select_device;
use phishnet_detect::feature_extraction::FeatureExtractor;
use phishnet_training::config::{load_or_default, PhishnetConfig};
use phishnet_training::datasets::{self, DatasetLoader, DatasetSummary};
use phishnet_training::training::classical::train_classical;
use phishnet_training::training::trainer::train_sequence;

/// TLDs listed in the dataset summary.
const SUMMARY_TOP_TLDS: usize = 10;

#[derive(Parser)]
#[command(name = "phishnet", about = "Phishing URL detection")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelKind {
    Classical,
    Sequence,
}

#[derive(Subcommand)]
enum Command {
    /// Train the random forest on lexical URL features.
    TrainClassical {
        /// JSON array or JSON Lines file of {url, label} records.
        #[arg(long)]
        dataset: PathBuf,

        /// Output path for the trained forest.
        #[arg(long, default_value = "models/forest.json")]
        output: PathBuf,

        /// Optional YAML configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Train on a seeded random subset of this many records.
        #[arg(long)]
        sample_size: Option<usize>,
    },

    /// Train the character-level CNN.
    TrainSequence {
        /// JSON array or JSON Lines file of {url, label} records.
        #[arg(long)]
        dataset: PathBuf,

        /// Directory for weights, vocabulary and manifest.
        #[arg(long, default_value = "models/sequence")]
        output_dir: PathBuf,

        /// Training epochs (3-10).
        #[arg(long)]
        epochs: Option<usize>,

        /// Convolution filters (64-128).
        #[arg(long)]
        filters: Option<usize>,

        /// Dropout rate (0.5-0.6).
        #[arg(long)]
        dropout: Option<f32>,

        /// Label smoothing factor.
        #[arg(long)]
        smoothing: Option<f64>,

        /// Do not add popular short domains as benign samples.
        #[arg(long)]
        no_augment: bool,

        /// Optional YAML configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Train on a seeded random subset of this many records.
        #[arg(long)]
        sample_size: Option<usize>,
    },

    /// Classify URLs with a trained model.
    Classify {
        /// Which model family to load.
        #[arg(long, value_enum)]
        model: ModelKind,

        /// Forest JSON file (classical) or artifact directory (sequence).
        #[arg(long)]
        artifacts: PathBuf,

        /// Optional YAML configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// URLs to classify.
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::TrainClassical {
            dataset,
            output,
            config,
            sample_size,
        } => {
            let config = load_or_default(config.as_deref())?;
            let records = load_records(
                &dataset,
                &config,
                sample_size,
                config.classical.seed,
                false,
            )?;
            let extractor = FeatureExtractor::new(&config.features);

            let outcome = train_classical(&records, &extractor, &config.classical)
                .context("Classical training failed")?;

            println!("\nClassification report (test={}):", outcome.test_size);
            println!("{}", outcome.report);
            println!("\nFeature importances:");
            for (name, importance) in &outcome.feature_importances {
                println!("  {name:<24} {importance:.4}");
            }

            let artifact = ClassicalArtifact::new(outcome.model, config.features.clone());
            artifacts::save_classical(&output, &artifact)?;
            println!(
                "\nAccuracy: {:.2}%  Model saved to: {}",
                outcome.accuracy * 100.0,
                output.display()
            );
            Ok(())
        }

        Command::TrainSequence {
            dataset,
            output_dir,
            epochs,
            filters,
            dropout,
            smoothing,
            no_augment,
            config,
            sample_size,
        } => {
            let mut config = load_or_default(config.as_deref())?;
            if let Some(epochs) = epochs {
                config.sequence.epochs = epochs;
            }
            if let Some(filters) = filters {
                config.sequence.model.filters = filters;
            }
            if let Some(dropout) = dropout {
                config.sequence.model.dropout = dropout;
            }
            if let Some(smoothing) = smoothing {
                config.sequence.label_smoothing = smoothing;
            }
            config.sequence.validate()?;

            let records = load_records(
                &dataset,
                &config,
                sample_size,
                config.sequence.seed,
                !no_augment,
            )?;
            let device = select_device(config.device);

            let outcome = train_sequence(&records, &config.sequence, &config.detector, &device)
                .context("Sequence training failed")?;

            println!("\nClassification report (dynamic thresholds):");
            println!("{}", outcome.report);

            artifacts::save_sequence(
                &output_dir,
                &outcome.varmap,
                &outcome.vocabulary,
                &config.sequence.model,
            )?;
            if let Some(last) = outcome.history.last() {
                println!(
                    "\nFinal epoch {}: val_loss={:.4} val_acc={:.4}",
                    last.epoch, last.val_loss, last.val_accuracy
                );
            }
            println!(
                "Accuracy: {:.2}%  Model saved to: {}",
                outcome.accuracy * 100.0,
                output_dir.display()
            );
            Ok(())
        }

        Command::Classify {
            model,
            artifacts: path,
            config,
            urls,
        } => {
            let config = load_or_default(config.as_deref())?;
            let scorer: Box<dyn UrlScorer> = match model {
                ModelKind::Classical => Box::new(artifacts::load_classical(&path)?.into_scorer()),
                ModelKind::Sequence => {
                    let device = select_device(config.device);
                    Box::new(artifacts::load_sequence(&path, &device)?)
                }
            };
            let detector = UrlDetector::new(scorer, &config.detector)?;

            for url in &urls {
                match detector.classify(url) {
                    Ok(c) => println!(
                        "{url}\t{}\t{:.2}%\t{}",
                        c.verdict,
                        c.probability_percent(),
                        c.reason
                    ),
                    Err(PhishnetError::MalformedInput(msg)) => {
                        eprintln!("Skipping {url:?}: {msg}");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(())
        }
    }
}

fn load_records(
    path: &Path,
    config: &PhishnetConfig,
    sample_size: Option<usize>,
    seed: u64,
    augment: bool,
) -> anyhow::Result<Vec<LabeledUrl>> {
    let dataset = DatasetLoader::load_from_file(path)
        .with_context(|| format!("Failed to load dataset {}", path.display()))?;

    let extractor = FeatureExtractor::new(&config.features);
    println!(
        "{}",
        DatasetSummary::compute(&dataset, &extractor, SUMMARY_TOP_TLDS)
    );

    let mut records = match sample_size {
        Some(size) if size < dataset.records.len() => {
            println!("Sampling {size} records");
            datasets::sample(&dataset.records, size, seed)
        }
        _ => dataset.records,
    };
    if augment {
        datasets::augment_with_popular_domains(&mut records);
    }
    Ok(records)
}
