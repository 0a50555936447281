//! Seqtag command-line client
//!
//! Sends encoded sentences to a serving endpoint, decodes saved responses
//! offline, and writes or inspects servable packages.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use seqtag_core::{
    ClientConfig, CrfDecoder, HttpScorer, NerConfig, Prediction, SavedModel, Sentence,
    ServingModel, TrainedModel,
};

/// CLI arguments
#[derive(Parser)]
#[command(name = "seqtag")]
#[command(about = "Client for CRF sequence taggers behind a model server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag JSON-lines sentences from stdin with the remote model
    Predict {
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Score JSON-lines `{"sentence": [...], "labels": [...]}` examples from stdin
    Evaluate {
        #[command(flatten)]
        remote: RemoteArgs,
    },
    /// Decode a saved prediction response without contacting the server
    Decode {
        /// Model configuration (JSON)
        #[arg(short, long, env = "SEQTAG_CONFIG")]
        config: PathBuf,

        /// Response body holding `logits` and `trans_params`
        #[arg(short, long)]
        response: PathBuf,

        /// True sentence lengths; defaults to the full padded length
        #[arg(short, long, value_delimiter = ',')]
        lengths: Vec<usize>,
    },
    /// Write a servable package from a safetensors checkpoint
    Export {
        /// Model configuration (JSON)
        #[arg(short, long, env = "SEQTAG_CONFIG")]
        config: PathBuf,

        /// Checkpoint holding at least `trans_params`
        #[arg(short, long)]
        variables: PathBuf,

        /// Export directory; must not exist
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Show the signature of a servable package
    Inspect {
        /// Export directory
        dir: PathBuf,
    },
}

#[derive(clap::Args)]
struct RemoteArgs {
    /// Model configuration (JSON)
    #[arg(short, long, env = "SEQTAG_CONFIG")]
    config: PathBuf,

    /// Prediction endpoint
    #[arg(short, long, env = "SEQTAG_API_URL")]
    url: String,

    /// Request timeout in seconds; waits indefinitely when omitted
    #[arg(short, long, env = "SEQTAG_TIMEOUT")]
    timeout: Option<u64>,
}

/// One tagged sentence on stdout.
#[derive(Debug, Serialize)]
struct TaggedOutput {
    length: usize,
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LabeledExample {
    sentence: Sentence,
    labels: Vec<String>,
}

impl RemoteArgs {
    fn connect(&self) -> Result<ServingModel> {
        let config = load_config(&self.config)?;
        let mut client = ClientConfig::new(&self.url);
        if let Some(secs) = self.timeout {
            client = client.with_timeout(Duration::from_secs(secs));
        }
        let scorer = HttpScorer::new(client).context("Failed to build HTTP client")?;
        Ok(ServingModel::with_scorer(config, scorer)?)
    }
}

fn load_config(path: &Path) -> Result<NerConfig> {
    NerConfig::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Parse non-empty stdin lines as JSON values.
fn read_json_lines<T: for<'de> Deserialize<'de>>() -> Result<Vec<T>> {
    let stdin = io::stdin();
    let mut items = Vec::new();

    for (n, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let item = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON on input line {}", n + 1))?;
        items.push(item);
    }

    Ok(items)
}

fn write_tagged(out: &mut impl Write, config: &NerConfig, labels: &[Vec<usize>]) -> Result<()> {
    for seq in labels {
        let output = TaggedOutput {
            length: seq.len(),
            tags: config.tags.names(seq)?,
        };
        serde_json::to_writer(&mut *out, &output)?;
        writeln!(out)?;
    }
    Ok(())
}

fn predict(remote: &RemoteArgs) -> Result<()> {
    let model = remote.connect()?;
    let sentences: Vec<Sentence> = read_json_lines()?;
    info!(sentences = sentences.len(), url = %remote.url, "tagging");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for batch in sentences.chunks(model.config().batch_size) {
        let (labels, _) = model.predict_batch(batch)?;
        write_tagged(&mut out, model.config(), &labels)?;
    }
    Ok(())
}

fn evaluate(remote: &RemoteArgs) -> Result<()> {
    let model = remote.connect()?;
    let tags = &model.config().tags;

    let examples = read_json_lines::<LabeledExample>()?
        .into_iter()
        .map(|ex| -> Result<(Sentence, Vec<usize>)> {
            let labels = ex
                .labels
                .iter()
                .map(|name| {
                    tags.index(name)
                        .with_context(|| format!("Unknown tag {name:?}"))
                })
                .collect::<Result<Vec<_>>>()?;
            if labels.len() != ex.sentence.len() {
                bail!(
                    "Sentence has {} tokens but {} labels",
                    ex.sentence.len(),
                    labels.len()
                );
            }
            Ok((ex.sentence, labels))
        })
        .collect::<Result<Vec<_>>>()?;

    let metrics = model.evaluate(&examples)?;
    info!("{}", metrics);
    println!("{}", serde_json::to_string(&metrics)?);
    Ok(())
}

fn decode(config: &Path, response: &Path, lengths: &[usize]) -> Result<()> {
    let config = load_config(config)?;
    config.ensure_viterbi()?;

    let raw = std::fs::read_to_string(response)
        .with_context(|| format!("Failed to read {}", response.display()))?;
    let prediction: Prediction = serde_json::from_str(&raw).context("Invalid response body")?;

    let lengths = if lengths.is_empty() {
        prediction.logits.iter().map(Vec::len).collect()
    } else {
        lengths.to_vec()
    };

    let labels = CrfDecoder::from_config(&config).decode_batch(&prediction, &lengths)?;
    let stdout = io::stdout();
    write_tagged(&mut stdout.lock(), &config, &labels)
}

fn export(config: &Path, variables: &Path, out: &Path) -> Result<()> {
    let config = load_config(config)?;
    let model = TrainedModel::from_safetensors(config, variables)
        .with_context(|| format!("Failed to load variables from {}", variables.display()))?;
    model.save_prediction_model(out)?;
    println!("Exported to {}", out.display());
    Ok(())
}

fn inspect(dir: &Path) -> Result<()> {
    let saved = SavedModel::load(dir)
        .with_context(|| format!("No servable package at {}", dir.display()))?;
    let manifest = saved.manifest();

    println!("tags: {}", manifest.tags.join(", "));
    println!("labels: {}", manifest.config.tags);
    for (key, sig) in &manifest.signature_def {
        println!("signature {key:?} ({})", sig.method_name);
        for (name, spec) in &sig.inputs {
            println!("  input  {name}: {spec}");
        }
        for (name, spec) in &sig.outputs {
            println!("  output {name}: {spec}");
        }
    }
    println!("variables: {}", manifest.variables.join(", "));
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict { remote } => predict(&remote),
        Commands::Evaluate { remote } => evaluate(&remote),
        Commands::Decode {
            config,
            response,
            lengths,
        } => decode(&config, &response, &lengths),
        Commands::Export {
            config,
            variables,
            out,
        } => export(&config, &variables, &out),
        Commands::Inspect { dir } => inspect(&dir),
    }
}
