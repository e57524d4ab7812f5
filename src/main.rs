use anyhow::Context;
use clap::Parser;
use docbatch::{Content, GenerationConfig, OutputFormat, Pipeline, TemplateRenderer};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "docbatch",
    version,
    author,
    about = "Bulk-generate rendered documents with sharded, resumable output",
    long_about = "Bulk-generate rendered documents across a pool of workers.\n\n\
    Each document is written to <out>/<run>/<shard>/doc_<index>.<ext>. A run that \
    is interrupted keeps its temporary directory; pass it to --resume to finish it \
    without rendering the documents already on disk.\n\n\
    USAGE EXAMPLES:\n  \
      # Generate 100 documents with the default layout\n  \
      docbatch\n\n  \
      # Generate 10000 documents from a sample text\n  \
      docbatch --content sample.txt --num-documents 10000 --out ./dataset\n\n  \
      # Finish an interrupted run\n  \
      docbatch --resume ./output/gen_1403_0926_-_tmp"
)]
struct Cli {
    /// Text file with paragraphs separated by blank lines
    #[arg(short, long, default_value = "sample.txt", value_name = "FILE", env = "DOCBATCH_CONTENT")]
    content: PathBuf,

    /// Directory that receives run directories
    #[arg(short, long, default_value = "output", value_name = "PATH", env = "DOCBATCH_OUT")]
    out: PathBuf,

    /// Resume an interrupted run from its temporary directory
    #[arg(long, value_name = "PATH")]
    resume: Option<PathBuf>,

    /// Number of documents to generate
    #[arg(short = 'n', long, default_value_t = 100, env = "DOCBATCH_NUM_DOCUMENTS")]
    num_documents: usize,

    /// Documents per batch
    #[arg(long, default_value_t = 50, env = "DOCBATCH_BATCH_SIZE")]
    batch_size: usize,

    /// Batches handed to a worker per dispatch
    #[arg(long, default_value_t = 1, env = "DOCBATCH_CHUNKSIZE")]
    chunksize: usize,

    /// Documents per shard directory
    #[arg(long, default_value_t = 1_000, env = "DOCBATCH_SHARD_SIZE")]
    shard_size: usize,

    /// Number of workers (defaults to the number of logical CPUs)
    #[arg(short = 'j', long, env = "DOCBATCH_WORKERS")]
    workers: Option<usize>,

    /// Raster resolution in DPI
    #[arg(long, default_value_t = 80, env = "DOCBATCH_RESOLUTION")]
    resolution: u32,

    /// Page encoding
    #[arg(short, long, value_enum, default_value = "jpeg", env = "DOCBATCH_FORMAT")]
    format: CliFormat,

    /// Encoder quality for lossy formats (1-100)
    #[arg(long, default_value_t = 70, env = "DOCBATCH_QUALITY")]
    quality: u8,

    /// Render in color instead of grayscale
    #[arg(long)]
    color: bool,

    /// Template name
    #[arg(short, long, default_value = "columns.html", env = "DOCBATCH_TEMPLATE")]
    template: String,

    /// Custom Tera template file, registered under --template
    #[arg(long, value_name = "FILE")]
    template_file: Option<PathBuf>,

    /// Print the run statistics as JSON instead of the summary box
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliFormat {
    Png,
    Jpeg,
}

impl From<CliFormat> for OutputFormat {
    fn from(f: CliFormat) -> Self {
        match f {
            CliFormat::Png => Self::Png,
            CliFormat::Jpeg => Self::Jpeg,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    let mut builder = GenerationConfig::builder()
        .num_documents(cli.num_documents)
        .batch_size(cli.batch_size)
        .chunksize(cli.chunksize)
        .shard_size(cli.shard_size)
        .resolution(cli.resolution)
        .output_format(cli.format.into())
        .quality(cli.quality)
        .grayscale(!cli.color)
        .template_name(cli.template.clone());

    if let Some(workers) = cli.workers {
        builder = builder.max_workers(workers);
    }

    let config = builder.build().context("Failed to build configuration")?;

    let mut renderer = TemplateRenderer::new();
    if let Some(path) = &cli.template_file {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        renderer = renderer
            .with_template(cli.template.clone(), source)
            .context("Failed to register template")?;
    }

    let content = load_content(&cli.content)?;

    let pipeline = Pipeline::new(config, renderer).context("Failed to create pipeline")?;
    let stats = match &cli.resume {
        Some(tmp_dir) => pipeline.resume(&content, tmp_dir),
        None => pipeline.run(&content, &cli.out),
    }
    .context("Generation run failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        stats.print_summary();
    }

    Ok(())
}

fn load_content(path: &std::path::Path) -> anyhow::Result<Content> {
    if !path.exists() {
        warn!(
            "{} not found, using placeholder paragraphs",
            path.display()
        );
        return Ok(Content::placeholder());
    }

    let content = Content::from_file(path)
        .with_context(|| format!("Failed to load content from {}", path.display()))?;
    if content.is_empty() {
        warn!("{} has no paragraphs, using placeholder paragraphs", path.display());
        return Ok(Content::placeholder());
    }
    Ok(content)
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("docbatch=info"),
        1 => EnvFilter::new("docbatch=debug"),
        _ => EnvFilter::new("docbatch=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_names(true))
        .init();

    Ok(())
}
