//! digitnet CLI
//!
//! Quantizes a trained float model, exports it for the microcontroller build
//! and validates the fixed-point datapath on the host.
//!
//! # Usage
//!
//! ```bash
//! # Quantize and export in one step
//! digitnet quantize --model float.safetensors --out quantized.safetensors --header network.h
//!
//! # Fixed-point vs float accuracy on a test set
//! digitnet compare --model quantized.safetensors --float float.safetensors --dataset mnist_small.safetensors
//!
//! # Classify every test image through the simulated device link
//! digitnet simulate --model quantized.safetensors --dataset mnist_small.safetensors
//! ```

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;

use digitnet_engine::{Engine, InputImage};
use digitnet_fixed_point::OverflowPolicy;
use digitnet_harness::{
    Dataset, DeviceSimulator, LoopbackTransport, Pipeline, Transport, ValidationConfig,
};
use digitnet_model::{
    load_quantized, save_quantized, write_header, NetworkConfig, QuantizedNetwork, Quantizer,
    SafetensorsLoader,
};

#[derive(Parser)]
#[command(name = "digitnet")]
#[command(version)]
#[command(about = "8-bit fixed-point digit classifier: quantizer, exporter and validator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quantize a trained float model
    Quantize {
        /// Float model (safetensors, Keras dense layer names)
        #[arg(short, long)]
        model: PathBuf,

        /// Where to write the quantized model
        #[arg(short, long)]
        out: PathBuf,

        /// Also export a device header
        #[arg(long)]
        header: Option<PathBuf>,

        /// Expected topology (JSON); the model must match it
        #[arg(long)]
        config: Option<PathBuf>,

        /// What to do when a value rounds to ±128: reject, clamp or reduce-shift
        #[arg(long, default_value = "reject")]
        on_overflow: OverflowPolicy,
    },

    /// Export a quantized model as a device header
    Export {
        /// Quantized model
        #[arg(short, long)]
        model: PathBuf,

        /// Header path
        #[arg(long, default_value = "network.h")]
        header: PathBuf,
    },

    /// Classify one raw image (one byte per pixel)
    Predict {
        /// Quantized model
        #[arg(short, long)]
        model: PathBuf,

        /// Raw image file
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Compare fixed-point and float accuracy on a labelled dataset
    Compare {
        /// Quantized model
        #[arg(short, long)]
        model: PathBuf,

        /// Float model the quantized one came from
        #[arg(short, long)]
        float: PathBuf,

        /// Test images and labels (safetensors)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Only use the first N images
        #[arg(short, long, env = "DIGITNET_IMG_COUNT")]
        limit: Option<usize>,

        /// Print the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Run a dataset through the simulated device link
    Simulate {
        /// Quantized model
        #[arg(short, long)]
        model: PathBuf,

        /// Test images and labels (safetensors)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Only use the first N images
        #[arg(short, long, env = "DIGITNET_IMG_COUNT")]
        limit: Option<usize>,
    },

    /// Show dimensions, shifts and rescale amounts of a quantized model
    Inspect {
        /// Quantized model
        #[arg(short, long)]
        model: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "digitnet=info".into()),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!("digitnet v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Quantize {
            model,
            out,
            header,
            config,
            on_overflow,
        } => run_quantize(&model, &out, header.as_deref(), config.as_deref(), on_overflow),
        Commands::Export { model, header } => run_export(&model, &header),
        Commands::Predict { model, image } => run_predict(&model, &image),
        Commands::Compare {
            model,
            float,
            dataset,
            limit,
            json,
        } => run_compare(&model, &float, &dataset, limit, json),
        Commands::Simulate {
            model,
            dataset,
            limit,
        } => run_simulate(&model, &dataset, limit),
        Commands::Inspect { model } => run_inspect(&model),
    }
}

fn load_model(path: &Path) -> Result<QuantizedNetwork> {
    load_quantized(path).with_context(|| format!("loading quantized model {}", path.display()))
}

fn run_quantize(
    model: &Path,
    out: &Path,
    header: Option<&Path>,
    config: Option<&Path>,
    policy: OverflowPolicy,
) -> Result<()> {
    let float = SafetensorsLoader::from_file(model)
        .and_then(|loader| loader.load_float_network())
        .with_context(|| format!("loading float model {}", model.display()))?;

    if let Some(path) = config {
        NetworkConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?
            .ensure_matches(&float.config())?;
    }

    let quantized = Quantizer::new(policy).quantize(&float)?;
    save_quantized(&quantized, out)?;
    println!(
        "{} Quantized model written to {}",
        style("[OK]").green().bold(),
        out.display()
    );

    if let Some(header) = header {
        write_header(&quantized, header)?;
        println!(
            "{} Header written to {}",
            style("[OK]").green().bold(),
            header.display()
        );
    }

    print_shifts(&quantized);
    Ok(())
}

fn run_export(model: &Path, header: &Path) -> Result<()> {
    let quantized = load_model(model)?;
    write_header(&quantized, header)?;
    println!(
        "{} Header written to {}",
        style("[OK]").green().bold(),
        header.display()
    );
    Ok(())
}

fn run_predict(model: &Path, image: &Path) -> Result<()> {
    let quantized = load_model(model)?;
    let pixels =
        std::fs::read(image).with_context(|| format!("reading image {}", image.display()))?;
    let prediction = Engine::new(&quantized).predict(&InputImage::from_pixels(pixels))?;

    println!("{} {}", style("Prediction:").cyan().bold(), prediction.class);
    println!();
    println!("  Class   Logit (raw)   Logit     Probability");
    for (class, ((raw, value), p)) in prediction
        .logits
        .iter()
        .zip(prediction.logit_values())
        .zip(prediction.probabilities())
        .enumerate()
    {
        println!("  {:>5}   {:>11}   {:>7.3}   {:>10.4}", class, raw, value, p);
    }
    Ok(())
}

fn run_compare(
    model: &Path,
    float: &Path,
    dataset: &Path,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let quantized = load_model(model)?;
    let float = SafetensorsLoader::from_file(float)
        .and_then(|loader| loader.load_float_network())
        .with_context(|| format!("loading float model {}", float.display()))?;
    let dataset = Dataset::load(dataset)?;

    let config = ValidationConfig::from_env().with_img_count(limit);
    let pipeline = Pipeline::new(quantized)
        .with_float(float)?
        .with_config(config);

    let count = pipeline.config().img_count.unwrap_or(dataset.len()).min(dataset.len());
    pipeline.verify_bit_exact(&dataset.images[..count])?;
    let report = pipeline.compare(&dataset)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", style("Fixed-point vs float").cyan().bold());
        println!("========================================");
        println!("  Images:         {}", report.total);
        println!(
            "  Float wrong:    {} ({:.2}%)",
            report.float_wrong,
            report.float_accuracy * 100.0
        );
        println!(
            "  Fixed wrong:    {} ({:.2}%)",
            report.fixed_wrong,
            report.fixed_accuracy * 100.0
        );
        println!("  Disagreements:  {}", report.disagreements);
        println!("  Accuracy drop:  {:.3}%", report.accuracy_drop() * 100.0);
    }

    if !report.within_tolerance() {
        bail!(
            "accuracy drop {:.3}% exceeds {:.3}%",
            report.accuracy_drop() * 100.0,
            report.max_accuracy_drop * 100.0
        );
    }
    println!("{} Within tolerance", style("[OK]").green().bold());
    Ok(())
}

fn run_simulate(model: &Path, dataset: &Path, limit: Option<usize>) -> Result<()> {
    let quantized = load_model(model)?;
    let mut dataset = Dataset::load(dataset)?;
    if let Some(limit) = ValidationConfig::from_env().with_img_count(limit).img_count {
        dataset.truncate(limit);
    }

    let mut link = LoopbackTransport::new(DeviceSimulator::new(quantized));
    let mut wrong = 0usize;
    let start = Instant::now();
    for (image, label) in dataset.iter() {
        if link.send(image)?.class != label as usize {
            wrong += 1;
        }
    }
    let elapsed = start.elapsed();

    let total = dataset.len().max(1);
    println!("{}", style("Device link simulation").cyan().bold());
    println!("========================================");
    println!("  Images:     {}", dataset.len());
    println!(
        "  Wrong:      {} ({:.2}% accuracy)",
        wrong,
        (dataset.len() - wrong) as f64 / total as f64 * 100.0
    );
    println!(
        "  Time:       {:.3} ms/image",
        elapsed.as_secs_f64() * 1000.0 / total as f64
    );
    Ok(())
}

fn run_inspect(model: &Path) -> Result<()> {
    let quantized = load_model(model)?;
    let config = quantized.config();

    println!("Model {}:", model.display());
    println!("  Input size:   {}", config.input_size);
    println!("  Hidden size:  {}", config.hidden_size);
    println!("  Output size:  {}", config.output_size);
    println!("  Size:         {} bytes", quantized.size_bytes());
    print_shifts(&quantized);
    Ok(())
}

fn print_shifts(network: &QuantizedNetwork) {
    println!("  img_bits:     {}", network.img_bits());
    println!("  l1w_bits:     {}", network.l1_weights().shift());
    println!("  l1b_bits:     {}", network.l1_bias().shift());
    println!("  l2w_bits:     {}", network.l2_weights().shift());
    println!("  l2b_bits:     {}", network.l2_bias().shift());
    println!("  Layer 1 rescale: {}", network.layer1_rescale());
    println!("  Layer 2 rescale: {}", network.layer2_rescale());
}
