//! supergrobid CLI - hybrid PDF structure extraction tool

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use supergrobid::model::Fragment;
use supergrobid::services::{
    CommandCitationClassifier, CommandEquationTranscriber, CommandRasterizer, CommandScaffold,
    CommandTableTranscriber, JsonRegionFile, MarkdownFileScaffold, RegionDetector,
};
use supergrobid::{
    BatchSummary, OutputFormat, Pipeline, PipelineConfig, ProcessedDocument, Region, RegionLabel,
};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "supergrobid")]
#[command(version)]
#[command(about = "Reconcile PDF text extraction with a generative structure scaffold", long_about = None)]
struct Cli {
    /// More logging (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one PDF
    Parse {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ProcessArgs,
    },

    /// Process many PDFs in parallel
    Batch {
        /// Input PDF files
        #[arg(value_name = "PDF", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        #[command(flatten)]
        options: ProcessArgs,
    },

    /// Show document information and font statistics
    Info {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Print metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Dump extracted fragments without reconciliation
    Extract {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Print fragments as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the regions a detector reported for a PDF
    Layout {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Region JSON file (default: <stem>.regions.json next to the PDF)
        #[arg(long, value_name = "FILE")]
        regions: Option<PathBuf>,

        /// Print regions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as TOML
    Config,

    /// Show version information
    Version,
}

#[derive(Args)]
struct ProcessArgs {
    /// Output format
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Scaffold Markdown file (default: <stem>.mmd next to the PDF)
    #[arg(long, value_name = "FILE", conflicts_with = "scaffold_cmd")]
    scaffold: Option<PathBuf>,

    /// Command that prints a Markdown scaffold for the PDF path appended to it
    #[arg(long, value_name = "CMD")]
    scaffold_cmd: Option<String>,

    /// Region JSON file (default: <stem>.regions.json next to the PDF)
    #[arg(long, value_name = "FILE")]
    regions: Option<PathBuf>,

    /// Configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Similarity threshold for accepting scaffold text (0-1]
    #[arg(long, value_name = "F")]
    threshold: Option<f32>,

    /// Lookahead window: N pages, fragments:N, or rest
    #[arg(long, value_name = "WINDOW")]
    lookahead: Option<String>,

    /// Deadline for every external service, in milliseconds
    #[arg(long, value_name = "N")]
    timeout_ms: Option<u64>,

    /// Disable generative table transcription
    #[arg(long)]
    no_table_fallback: bool,

    /// Render pages with pdftoppm for image-based resolvers
    #[arg(long)]
    rasterize: bool,

    /// Table transcriber command (reads PNG or text on stdin)
    #[arg(long, value_name = "CMD")]
    table_cmd: Option<String>,

    /// Equation transcriber command (reads PNG on stdin)
    #[arg(long, value_name = "CMD")]
    equation_cmd: Option<String>,

    /// Citation classifier command (reads one citation on stdin, prints JSON)
    #[arg(long, value_name = "CMD")]
    citation_cmd: Option<String>,

    /// Include YAML frontmatter (Markdown only)
    #[arg(long)]
    frontmatter: bool,

    /// Output compact JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Markdown with unresolved markers
    Markdown,
    /// Structured JSON tree
    Json,
    /// TEI XML
    Tei,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Markdown => OutputFormat::Markdown,
            Format::Json => OutputFormat::Json,
            Format::Tei => OutputFormat::Tei,
        }
    }
}

impl ProcessArgs {
    fn config(&self) -> CliResult<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(format) = self.format {
            config.output.format = format.into();
        }
        if let Some(threshold) = self.threshold {
            config.reconcile.similarity_threshold = threshold;
        }
        if let Some(ref lookahead) = self.lookahead {
            config.reconcile.lookahead = lookahead.parse()?;
        }
        if let Some(ms) = self.timeout_ms {
            config.timeouts = supergrobid::TimeoutConfig::uniform(ms);
        }
        if self.no_table_fallback {
            config.resolvers.table_fallback = false;
        }
        if self.frontmatter {
            config.output.include_frontmatter = true;
        }
        if self.compact {
            config.output.compact = true;
        }

        config.validate()?;
        Ok(config)
    }

    fn pipeline(&self, config: PipelineConfig) -> CliResult<Pipeline> {
        let mut builder = Pipeline::builder().with_config(config);

        builder = match (&self.scaffold, &self.scaffold_cmd) {
            (_, Some(cmd)) => builder.with_scaffold(Arc::new(CommandScaffold::new(cmd)?)),
            (Some(path), None) => builder.with_scaffold(Arc::new(MarkdownFileScaffold::new(path))),
            (None, None) => builder.with_scaffold(Arc::new(MarkdownFileScaffold::sibling())),
        };
        builder = match &self.regions {
            Some(path) => builder.with_region_detector(Arc::new(JsonRegionFile::new(path))),
            None => builder.with_region_detector(Arc::new(JsonRegionFile::sibling())),
        };

        if self.rasterize {
            builder = builder.with_rasterizer(Arc::new(CommandRasterizer::pdftoppm()));
        }
        if let Some(ref cmd) = self.table_cmd {
            builder = builder.with_table_transcriber(Arc::new(CommandTableTranscriber::new(cmd)?));
        }
        if let Some(ref cmd) = self.equation_cmd {
            builder = builder.with_equation_transcriber(Arc::new(CommandEquationTranscriber::new(cmd)?));
        }
        if let Some(ref cmd) = self.citation_cmd {
            builder = builder.with_citation_classifier(Arc::new(CommandCitationClassifier::new(cmd)?));
        }

        Ok(builder.build()?)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Parse {
            input,
            output,
            options,
        } => cmd_parse(&input, output.as_deref(), &options),
        Commands::Batch {
            inputs,
            output,
            options,
        } => cmd_batch(&inputs, &output, &options),
        Commands::Info { input, json } => cmd_info(&input, json),
        Commands::Extract { input, json } => cmd_extract(&input, json),
        Commands::Layout {
            input,
            regions,
            json,
        } => cmd_layout(&input, regions.as_deref(), json),
        Commands::Config => cmd_config(),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>, options: &ProcessArgs) -> CliResult {
    let config = options.config()?;
    let render_options = config.output.clone();
    let pipeline = options.pipeline(config)?;

    log::info!("Processing {}", input.display());
    let doc = pipeline.process(input)?;
    let rendered = doc.render(&render_options)?;

    if let Some(path) = output {
        fs::write(path, &rendered)?;
        eprintln!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", rendered);
    }
    print_report(&doc);

    Ok(())
}

fn print_report(doc: &ProcessedDocument) {
    let report = &doc.report;
    let stats = &report.reconcile;
    eprintln!(
        "{} {} accepted, {} discarded, {} orphan paragraphs, {} resolved ({}ms)",
        "Reconciled:".cyan(),
        stats.accepted,
        stats.discarded,
        stats.orphan_paragraphs,
        report.resolved,
        report.elapsed_ms
    );
    for degradation in &report.degradations {
        let label = if degradation.timed_out {
            "Timed out:"
        } else {
            "Degraded:"
        };
        eprintln!(
            "  {} {} ({})",
            label.yellow(),
            degradation.stage,
            degradation.message.dimmed()
        );
    }
    for failure in &report.resolver_failures {
        eprintln!(
            "  {} {} #{}: {}",
            "Unresolved".yellow(),
            failure.kind,
            failure.element,
            failure.reason.dimmed()
        );
    }
    if report.unverified_tables > 0 {
        eprintln!(
            "  {} {} table(s) from generative transcription",
            "Unverified:".yellow(),
            report.unverified_tables
        );
    }
}

fn cmd_batch(inputs: &[PathBuf], output_dir: &Path, options: &ProcessArgs) -> CliResult {
    let config = options.config()?;
    let render_options = config.output.clone();
    let extension = render_options.format.extension();
    let pipeline = options.pipeline(config)?;

    fs::create_dir_all(output_dir)?;

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let items = pipeline.process_batch_with(inputs, |item| {
        pb.set_message(item.path.display().to_string());
        pb.inc(1);
    });
    pb.finish_with_message("Done!");

    let mut write_failures = 0;
    for item in &items {
        match &item.result {
            Ok(doc) => {
                let stem = item.path.file_stem().unwrap_or_default().to_string_lossy();
                let target = output_dir.join(format!("{}.{}", stem, extension));
                match doc.render(&render_options).map(|text| fs::write(&target, text)) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        write_failures += 1;
                        eprintln!("{} {}: {}", "Failed".red(), target.display(), e);
                    }
                    Err(e) => {
                        write_failures += 1;
                        eprintln!("{} {}: {}", "Failed".red(), item.path.display(), e);
                    }
                }
            }
            Err(e) => eprintln!("{} {}: {}", "Failed".red(), item.path.display(), e),
        }
    }

    let summary = BatchSummary::from_items(&items);
    println!("\n{}", "Batch Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!(
        "{}: {}",
        "Succeeded".bold(),
        (summary.succeeded - write_failures).to_string().green()
    );
    let failed = summary.failed + write_failures;
    let failed = if failed > 0 {
        failed.to_string().red()
    } else {
        failed.to_string().normal()
    };
    println!("{}: {}", "Failed".bold(), failed);
    println!("{}: {}", "Degraded".bold(), summary.degraded.to_string().yellow());
    println!(
        "{}: {} accepted, {} discarded ({:.1}%)",
        "Scaffold".bold(),
        summary.reconcile.accepted,
        summary.reconcile.discarded,
        summary.reconcile.discard_rate() * 100.0
    );
    println!("{}: {}", "Resolver failures".bold(), summary.resolver_failures);
    println!("{}: {}", "Unverified tables".bold(), summary.unverified_tables);
    println!("{}: {}", "Output".bold(), output_dir.display());

    Ok(())
}

fn cmd_info(input: &Path, json: bool) -> CliResult {
    let doc = supergrobid::extract_file(input)?;
    let metadata = &doc.metadata;

    if json {
        println!("{}", serde_json::to_string_pretty(metadata)?);
        return Ok(());
    }

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), metadata.pdf_version);
    println!("{}: {}", "Pages".bold(), doc.page_count());
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if metadata.encrypted { "Yes" } else { "No" }
    );
    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let words: usize = doc
        .fragments
        .iter()
        .map(|f| f.text.split_whitespace().count())
        .sum();
    println!("{}: {}", "Fragments".bold(), doc.fragments.len());
    println!("{}: {}", "Words".bold(), words);

    let fonts = doc.font_statistics();
    println!("{}: {:.1}pt", "Body font".bold(), fonts.body_size);
    if !fonts.heading_sizes.is_empty() {
        let sizes: Vec<String> = fonts.heading_sizes.iter().map(|s| format!("{:.1}pt", s)).collect();
        println!("{}: {}", "Heading fonts".bold(), sizes.join(", "));
    }

    for page in doc.pages.iter().take(5) {
        println!(
            "  {} page {}: {:.0} x {:.0}pt, {} fragments",
            "├─".dimmed(),
            page.index + 1,
            page.width,
            page.height,
            doc.page_fragments(page.index).count()
        );
    }
    if doc.pages.len() > 5 {
        println!("  {} {} more pages", "└─".dimmed(), doc.pages.len() - 5);
    }

    Ok(())
}

fn cmd_extract(input: &Path, json: bool) -> CliResult {
    let doc = supergrobid::extract_file(input)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc.fragments)?);
        return Ok(());
    }

    println!(
        "{} {} fragments on {} pages",
        "Extracted".cyan().bold(),
        doc.fragments.len(),
        doc.page_count()
    );
    println!("{}", "─".repeat(40).dimmed());
    for fragment in &doc.fragments {
        println!("{}", fragment_line(fragment));
    }
    Ok(())
}

/// `p<page> [x0, y0, x1, y1] <size>pt  text`, pages 1-based.
fn fragment_line(fragment: &Fragment) -> String {
    let b = fragment.bbox;
    let size = fragment
        .font_size
        .map(|s| format!("{:.1}pt", s))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "p{} [{:.0}, {:.0}, {:.0}, {:.0}] {:>6}  {}",
        fragment.page + 1,
        b.x0,
        b.y0,
        b.x1,
        b.y1,
        size,
        fragment.text
    )
}

fn load_regions(input: &Path, regions: Option<&Path>) -> CliResult<Vec<Region>> {
    let detector = match regions {
        Some(path) => JsonRegionFile::new(path),
        None => JsonRegionFile::sibling(),
    };
    Ok(detector.detect_regions(input)?)
}

/// Region counts per label, in order of first appearance.
fn label_counts(regions: &[Region]) -> Vec<(RegionLabel, usize)> {
    let mut counts: Vec<(RegionLabel, usize)> = Vec::new();
    for region in regions {
        match counts.iter_mut().find(|(label, _)| *label == region.label) {
            Some((_, n)) => *n += 1,
            None => counts.push((region.label, 1)),
        }
    }
    counts
}

fn cmd_layout(input: &Path, regions: Option<&Path>, json: bool) -> CliResult {
    let regions = load_regions(input, regions)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&regions)?);
        return Ok(());
    }

    println!("{} {} regions", "Layout".cyan().bold(), regions.len());
    println!("{}", "─".repeat(40).dimmed());
    for (label, n) in label_counts(&regions) {
        println!("{}: {}", label.to_string().bold(), n);
    }
    println!();
    for region in &regions {
        let b = region.bbox;
        println!(
            "  {} p{} {:<10} [{:.0}, {:.0}, {:.0}, {:.0}] {}",
            "├─".dimmed(),
            region.page + 1,
            region.label.as_str(),
            b.x0,
            b.y0,
            b.x1,
            b.y1,
            format!("{:.2}", region.confidence).dimmed()
        );
    }
    Ok(())
}

fn cmd_config() -> CliResult {
    print!("{}", PipelineConfig::default().to_toml_string()?);
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "supergrobid".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Hybrid PDF structure extraction");
    println!();
    println!("Default rasterizer: {}", "pdftoppm".dimmed());
    println!("License: MIT");
}
