use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use jsonschema_datagen_core::{
    flatten, AllOfOption, FlattenOptions, Generator, Policy, SchemaNavigator,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "jsonschema-datagen")]
#[command(about = "Generate sample JSON documents that conform to a JSON Schema")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one document from a JSON Schema
    Generate {
        /// Input JSON Schema file
        input: PathBuf,

        /// Output file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Built-in generation policy
        #[arg(short, long, value_enum, default_value_t = PresetArg::Normal)]
        preset: PresetArg,

        /// JSON policy file; replaces the preset
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Generate only the sub-schema at this path (e.g. `$.items[*]`)
        #[arg(long)]
        path: Option<String>,

        /// Leave `allOf` unmerged
        #[arg(long)]
        no_merge_all_of: bool,

        /// Max traversal depth while flattening
        #[arg(long, default_value_t = 50)]
        max_depth: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Print the flattened sub-schema at a path
    Navigate {
        /// Input JSON Schema file
        input: PathBuf,

        /// Path such as `$.user.tags[0]`
        path: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Print the built-in presets as policy JSON
    Presets {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum PresetArg {
    Minimal,
    Normal,
    Verbose,
    Skeleton,
}

impl From<PresetArg> for Policy {
    fn from(val: PresetArg) -> Self {
        match val {
            PresetArg::Minimal => Policy::minimal(),
            PresetArg::Normal => Policy::normal(),
            PresetArg::Verbose => Policy::verbose(),
            PresetArg::Skeleton => Policy::skeleton(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing: logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Generate {
            input,
            output,
            preset,
            policy,
            seed,
            path,
            no_merge_all_of,
            max_depth,
            format,
        } => {
            let policy = match policy {
                Some(policy_path) => read_json::<Policy>(&policy_path, "policy")?,
                None => preset.into(),
            };

            let options = FlattenOptions {
                all_of: if no_merge_all_of {
                    AllOfOption::Skip
                } else {
                    AllOfOption::Merge
                },
                max_depth,
                ..FlattenOptions::default()
            };
            let schema = load_schema(&input, &options)?;

            // Residual `$ref`s in a sub-schema resolve against the whole
            // flattened document.
            let target = match path {
                Some(path) => SchemaNavigator::new(schema.clone())
                    .schema(&path)
                    .with_context(|| format!("Failed to select {path}"))?,
                None => schema.clone(),
            };
            let generator = Generator::new(policy);
            let value = match seed {
                Some(seed) => {
                    let mut rng = StdRng::seed_from_u64(seed);
                    generator.generate_at(&schema, &target, &mut rng)
                }
                None => {
                    let mut rng = rand::thread_rng();
                    generator.generate_at(&schema, &target, &mut rng)
                }
            };

            write_json(&value, output.as_ref(), format)?;
        }
        Commands::Navigate {
            input,
            path,
            format,
        } => {
            let schema = load_schema(&input, &FlattenOptions::default())?;
            let sub_schema = SchemaNavigator::new(schema)
                .schema(&path)
                .with_context(|| format!("Failed to select {path}"))?;
            write_json(&sub_schema, None, format)?;
        }
        Commands::Presets { format } => {
            let mut presets = Map::new();
            for (name, preset) in [
                ("minimal", PresetArg::Minimal),
                ("normal", PresetArg::Normal),
                ("verbose", PresetArg::Verbose),
                ("skeleton", PresetArg::Skeleton),
            ] {
                let policy = Policy::from(preset);
                let value = serde_json::to_value(policy).context("Failed to serialize policy")?;
                presets.insert(name.to_string(), value);
            }
            write_json(&Value::Object(presets), None, format)?;
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {what} file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {what} from: {}", path.display()))
}

fn load_schema(path: &Path, options: &FlattenOptions) -> Result<Value> {
    let raw: Value = read_json(path, "schema")?;
    flatten(&raw, options).map_err(|e| anyhow::Error::from(e).context("Flattening failed"))
}

fn write_json<T: serde::Serialize>(
    val: &T,
    path: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    // Ensure trailing newline
    writeln!(writer).context("Failed to write trailing newline")?;

    Ok(())
}
