use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use treesent::config::OutputConfig;
use treesent::{evaluate_model, load_model, Config, TrainingSession};

#[derive(Parser)]
#[command(name = "treesent")]
#[command(about = "Train and evaluate Tree-LSTM sentiment models", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a training session
    Train {
        /// Session configuration (JSON or YAML)
        #[arg(short, long, env = "TREESENT_CONFIG")]
        config: PathBuf,

        /// Override the number of epochs
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Start from this parameter checkpoint instead of pretrained embeddings
        #[arg(short, long)]
        load_params: Option<PathBuf>,

        /// Write params.safetensors and metrics.json into this directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Evaluate a trained model on a validation file
    Evaluate {
        /// Vocabulary the model was trained with
        #[arg(short, long)]
        vocab: PathBuf,

        /// Parameter checkpoint
        #[arg(short, long)]
        params: PathBuf,

        /// Validation examples; profit is reported when every example has a lag
        #[arg(short, long)]
        data: PathBuf,

        /// Session configuration providing model dimensions and F1 mode
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate configuration file
    Config {
        /// Configuration file to validate
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match cli.command {
        Commands::Train {
            config,
            epochs,
            load_params,
            output_dir,
        } => train(config, epochs, load_params, output_dir),

        Commands::Evaluate {
            vocab,
            params,
            data,
            config,
        } => evaluate(vocab, params, data, config),

        Commands::Config { file } => validate_config(file),
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &Path) -> Result<Config> {
    Config::from_file(path).with_context(|| format!("Failed to load configuration file {}", path.display()))
}

fn train(
    config_path: PathBuf,
    epochs: Option<usize>,
    load_params: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config(&config_path)?;
    if let Some(epochs) = epochs {
        config.training.num_epochs = epochs;
    }
    if let Some(path) = load_params {
        config.data.init_params_path = Some(path);
    }
    if let Some(dir) = output_dir {
        config.output = OutputConfig::in_dir(dir);
    }
    config.validate().context("Invalid configuration")?;

    info!("Starting training session from {}", config_path.display());
    let mut session =
        TrainingSession::from_config(config, None).context("Failed to initialize training session")?;
    let outcome = session.run().context("Training failed")?;

    info!(
        "Training complete: {} epochs, {} parameter values",
        outcome.metrics.len(),
        outcome.params.num_values()
    );
    if let (Some(accuracy), Some(f1)) = (
        outcome.metrics.dev_accuracy().last(),
        outcome.metrics.f1_score().last(),
    ) {
        println!("Final dev accuracy: {accuracy:.4}");
        println!("Final dev F1:       {f1:.4}");
    }

    Ok(())
}

fn evaluate(vocab: PathBuf, params: PathBuf, data: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let config = match config_path {
        Some(path) => load_config(&path)?,
        None => Config::default(),
    };

    let model = load_model(&vocab, &params, &config.model).context("Failed to load model")?;
    let evaluation =
        evaluate_model(&model, &data, config.training.f1_mode).context("Evaluation failed")?;

    println!("Accuracy: {:.4}", evaluation.accuracy);
    println!("F1 score: {:.4}", evaluation.f1_score);
    println!("Confusion matrix (rows: true, columns: predicted):");
    println!("{}", evaluation.conf_matrix);
    if let Some(profit) = evaluation.mean_profit {
        println!("Mean profit: {profit:.6}");
    }

    Ok(())
}

fn validate_config(config_path: PathBuf) -> Result<()> {
    info!("Validating configuration file: {}", config_path.display());

    let config = load_config(&config_path)?;

    info!("Configuration is valid");
    info!(
        "  - Model: emb_dim={} hidden_dim={} optimizer={:?} lr={}",
        config.model.embedding_dim,
        config.model.hidden_dim,
        config.model.optimizer,
        config.model.learning_rate
    );
    info!("  - Epochs: {} (F1 mode {:?})", config.training.num_epochs, config.training.f1_mode);
    info!("  - Dataset: {:?}", config.data.source);

    Ok(())
}
