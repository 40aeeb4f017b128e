use anyhow::{anyhow, Context, Result};
use clap::Parser;
use image::{ImageBuffer, Luma};
use indicatif::{ProgressBar, ProgressStyle};
use mnist_data::data_sets::{fetcher_for, TEST_IMAGES, TEST_LABELS, TRAIN_IMAGES, TRAIN_LABELS};
use mnist_data::idx::{extract_images, extract_labels};
use mnist_data::progress::decode_progress_bar;
use mnist_data::{read_data_sets_with, DataSet, Labels, LoaderConfig};
use ndarray::{s, Array4};
use std::path::{Path, PathBuf};

/// Helper function to create a consistent progress bar style
fn create_progress_bar(total: u64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:80.cyan/blue}] {pos}/{len} ({percent}%)")
            .context("Failed to set progress bar template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Builds the loader configuration from an optional file and command line overrides.
fn load_config(args: &Args) -> Result<LoaderConfig> {
    let mut config = match &args.config {
        Some(path) => LoaderConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => LoaderConfig::default(),
    };

    if let Some(dir) = &args.data_dir {
        config.train_dir = dir.clone();
    }
    if let Some(url) = &args.source_url {
        config.source_url = url.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if args.dense_labels {
        config.one_hot = false;
    }
    Ok(config)
}

fn fetch(config: &LoaderConfig) -> Result<()> {
    let fetcher = fetcher_for(config).context("Failed to create HTTP client")?;
    for filename in [TRAIN_IMAGES, TRAIN_LABELS, TEST_IMAGES, TEST_LABELS] {
        let path = fetcher
            .maybe_download(filename, &config.train_dir)
            .with_context(|| format!("Failed to fetch {filename}"))?;
        println!("{}", path.display());
    }
    Ok(())
}

fn describe<R>(name: &str, data_set: &DataSet<R>)
where
    R: rand::Rng,
{
    println!(
        "{name:<10} examples: {:>6}  images: {:?}  labels: {:?}",
        data_set.num_examples(),
        data_set.images().shape(),
        data_set.labels().shape()
    );
}

fn summary(config: &LoaderConfig) -> Result<()> {
    let data_sets = read_data_sets_with(config).context("Failed to read MNIST data sets")?;

    println!();
    describe("train", &data_sets.train);
    describe("validation", &data_sets.validation);
    describe("test", &data_sets.test);
    Ok(())
}

fn batches(config: &LoaderConfig, batch_size: usize, steps: u64) -> Result<()> {
    let mut data_sets = read_data_sets_with(config).context("Failed to read MNIST data sets")?;

    println!("\nDrawing {steps} batches of {batch_size} training examples...");
    let progress_bar = create_progress_bar(steps)?;
    let mut served = 0;
    for _ in 0..steps {
        let batch = data_sets
            .train
            .next_batch(batch_size)
            .context("Failed to draw batch")?;
        served += batch.len();
        progress_bar.inc(1);
    }
    progress_bar.finish_with_message("Batching complete");

    println!(
        "Served {served} examples, epochs completed: {}",
        data_sets.train.epochs_completed()
    );
    Ok(())
}

fn save_image(images: &Array4<u8>, index: usize, label: u8, out: &Path) -> Result<PathBuf> {
    let image = images.slice(s![index, .., .., 0]);
    let (rows, cols) = image.dim();
    let width = u32::try_from(cols).context("Image too wide")?;
    let height = u32::try_from(rows).context("Image too tall")?;

    let buffer = ImageBuffer::from_fn(width, height, |x, y| {
        Luma([image.get((y as usize, x as usize)).copied().unwrap_or(0)])
    });
    let path = out.join(format!("test_{label}_image_{index}.png"));
    buffer
        .save(&path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(path)
}

fn save_images(config: &LoaderConfig, count: usize, out: &Path) -> Result<()> {
    let fetcher = fetcher_for(config).context("Failed to create HTTP client")?;
    let images = extract_images(
        fetcher.maybe_download(TEST_IMAGES, &config.train_dir)?,
        &decode_progress_bar(),
    )
    .context("Failed to decode test images")?;
    let Labels::Dense(labels) = extract_labels(
        fetcher.maybe_download(TEST_LABELS, &config.train_dir)?,
        false,
        &decode_progress_bar(),
    )
    .context("Failed to decode test labels")?
    else {
        return Err(anyhow!("Expected dense test labels"));
    };

    std::fs::create_dir_all(out).context("Failed to create output directory")?;
    for (index, &label) in labels.iter().enumerate().take(count) {
        let path = save_image(&images, index, label, out)?;
        println!("Test image {index} label: {label} -> {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Command::Fetch => fetch(&config).context("Failed to fetch MNIST archives")?,
        Command::Summary => summary(&config).context("Failed to summarize MNIST data")?,
        Command::Batches { batch_size, steps } => {
            batches(&config, batch_size, steps).context("Failed to draw batches")?
        }
        Command::SaveImages { count, out } => {
            save_images(&config, count, &out).context("Failed to save MNIST images")?
        }
    }

    Ok(())
}

#[derive(clap::Parser)]
#[command(name = "mnist", about = "Fetch, inspect and batch the MNIST dataset", long_about = None)]
struct Args {
    /// Directory the archives are cached in
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// JSON loader configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Base URL to download missing archives from
    #[arg(long, global = true)]
    source_url: Option<String>,
    /// Seed for reproducible shuffling
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Keep labels as class indices instead of one-hot rows
    #[arg(long, global = true)]
    dense_labels: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
#[command(about = "MNIST data operations")]
enum Command {
    /// Download any missing archives
    Fetch,
    /// Load the train, validation and test sets and print their shapes
    Summary,
    /// Draw training batches and report how many epochs they span
    Batches {
        #[arg(long, default_value_t = 100)]
        batch_size: usize,
        #[arg(long, default_value_t = 1000)]
        steps: u64,
    },
    /// Save the first test images as PNG files
    SaveImages {
        #[arg(long, default_value_t = 5)]
        count: usize,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}
