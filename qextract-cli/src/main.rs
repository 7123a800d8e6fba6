use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Import from qextract-core
use qextract_core::{
    CleaningMode, Document, DocumentInfo, DocumentProcessor, KeywordAnalyzer, MemorySink, OutputFormat,
    PipelineConfig, PipelineError, PipelineStages, QuestionAnalyzer, QuestionReport, TracingSink,
};

// Import CLI utilities
use qextract_cli::ToolLocator;

#[derive(Parser)]
#[command(name = "qextract")]
#[command(about = "Extract exam questions and answer choices from PDF, DOCX and image files")]
struct Args {
    /// Documents to process (.pdf, .docx, .jpg, .jpeg, .png). Several inputs run in parallel.
    #[arg(short, long, num_args = 1.., required_unless_present_any = ["show_configs", "check_tools"])]
    input: Vec<PathBuf>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format: report, flat, or text
    #[arg(short = 'f', long, default_value = "report")]
    output_format: String,

    /// Output file path (a directory when several inputs are given).
    /// If not specified, auto-generated from the input name
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print results to stdout instead of writing files
    #[arg(long)]
    stdout: bool,

    /// Run the placeholder question-type/topic analysis on the results
    #[arg(long)]
    analyze: bool,

    /// Enable per-stage timing of the pipeline
    #[arg(long)]
    profile: bool,

    /// Print the extracted text normalized with this mode instead of segmenting it
    #[arg(long, value_enum)]
    clean: Option<CleanMode>,

    /// Dump all intermediate pipeline stage outputs to a directory
    /// Captures: raw text, cleaned text, segmentation, and emitted events
    #[arg(long)]
    dump_stages: bool,

    /// Directory for stage dump output
    #[arg(long, default_value = "qextract_stages")]
    stages_dir: PathBuf,

    /// Check that the external OCR tools are installed and exit
    #[arg(long)]
    check_tools: bool,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CleanMode {
    Light,
    Aggressive,
}

impl From<CleanMode> for CleaningMode {
    fn from(mode: CleanMode) -> Self {
        match mode {
            CleanMode::Light => CleaningMode::Light,
            CleanMode::Aggressive => CleaningMode::Aggressive,
        }
    }
}

/// Shared, read-only state for processing a batch of inputs
struct RunContext {
    processor: DocumentProcessor,
    analyzer: Option<KeywordAnalyzer>,
    format: OutputFormat,
    output: Option<PathBuf>,
    multiple_inputs: bool,
    to_stdout: bool,
    profile: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "qextract=info,qextract_cli=info,qextract_core=info",
        1 => "qextract=debug,qextract_cli=debug,qextract_core=debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    if args.show_configs {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(args.config.as_deref())?;

    if args.check_tools {
        return Ok(check_tools(&config));
    }

    let processor = DocumentProcessor::from_config(&config)?.with_event_sink(Arc::new(TracingSink));

    if let Some(mode) = args.clean {
        return Ok(clean_documents(&processor, &args.input, mode.into()));
    }

    if args.dump_stages {
        return Ok(dump_all_stages(&processor, &args.input, &args.stages_dir));
    }

    let ctx = RunContext {
        processor,
        analyzer: args.analyze.then(|| KeywordAnalyzer::from_config(&config.analysis)),
        format: args.output_format.parse()?,
        output: args.output,
        multiple_inputs: args.input.len() > 1,
        to_stdout: args.stdout,
        profile: args.profile,
    };

    if let (Some(dir), true) = (&ctx.output, ctx.multiple_inputs) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    tracing::info!(documents = args.input.len(), "processing");
    let failures = args
        .input
        .par_iter()
        .map(|input| process_document(&ctx, input).map_err(|e| report_failure(input, &e)))
        .filter(Result::is_err)
        .count();

    if failures > 0 {
        tracing::warn!(failures, total = args.input.len(), "some documents failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// `--config` must load; the per-user config falls back to defaults with a warning
fn load_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    if let Some(path) = explicit {
        let config = PipelineConfig::load_from_file(path)?;
        tracing::info!(path = %path.display(), "loaded config");
        return Ok(config);
    }

    match ToolLocator::default_config_path().filter(|p| p.exists()) {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading user config");
            Ok(PipelineConfig::load_with_fallback(Some(&path)))
        }
        None => {
            tracing::debug!("using default config");
            Ok(PipelineConfig::default())
        }
    }
}

fn process_document(ctx: &RunContext, input: &Path) -> Result<()> {
    let document = Document::from_path(input)?;
    let stages = ctx.processor.run_with_profiling(&document, ctx.profile)?;

    let info = DocumentInfo::describe(&document, &stages.extraction).map_err(PipelineError::from)?;
    let mut report = QuestionReport::new(info, stages.segmentation.batch);
    if let Some(analyzer) = &ctx.analyzer {
        let analysis = analyzer.analyze(&report.questions.question_texts())?;
        report = report.with_analysis(analysis);
    }

    if ctx.to_stdout {
        println!("{}", report.render(ctx.format)?);
        return Ok(());
    }

    let output_path = output_path_for(ctx, input);
    report
        .save_with_format(&output_path, ctx.format)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    tracing::info!(
        input = %input.display(),
        output = %output_path.display(),
        questions = report.questions.len(),
        "saved results"
    );
    Ok(())
}

fn output_path_for(ctx: &RunContext, input: &Path) -> PathBuf {
    let input_name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let file_name = format!("{input_name}_questions.{}", ctx.format.extension());

    match &ctx.output {
        Some(dir) if ctx.multiple_inputs => dir.join(file_name),
        Some(path) => path.clone(),
        None => PathBuf::from(file_name),
    }
}

/// User-facing message on stderr, full cause chain in the log
fn report_failure(input: &Path, err: &anyhow::Error) {
    match err.downcast_ref::<PipelineError>() {
        Some(pipeline_err) => {
            eprintln!("{}: {}", input.display(), pipeline_err.user_message());
            tracing::error!(
                input = %input.display(),
                kind = pipeline_err.kind(),
                error = %format!("{err:#}"),
                "document failed"
            );
        }
        None => {
            eprintln!("{}: {err:#}", input.display());
            tracing::error!(input = %input.display(), error = %format!("{err:#}"), "document failed");
        }
    }
}

fn clean_documents(processor: &DocumentProcessor, inputs: &[PathBuf], mode: CleaningMode) -> ExitCode {
    let mut failed = false;
    for input in inputs {
        let result = Document::from_path(input)
            .and_then(|document| processor.extract(&document))
            .map(|extraction| processor.normalizer().normalize(&extraction.text, mode));
        match result {
            Ok(cleaned) => println!("{cleaned}"),
            Err(e) => {
                report_failure(input, &anyhow::Error::from(e));
                failed = true;
            }
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn dump_all_stages(processor: &DocumentProcessor, inputs: &[PathBuf], stages_dir: &Path) -> ExitCode {
    tracing::info!(dir = %stages_dir.display(), "pipeline stage dump mode");
    let mut failed = false;
    for input in inputs {
        let observer = MemorySink::new();
        let result = Document::from_path(input)
            .and_then(|document| processor.process_capture_stages(&document, &observer))
            .map_err(anyhow::Error::from)
            .and_then(|stages| {
                let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
                save_stages(&stages, &observer, input, &stages_dir.join(stem))
            });
        if let Err(e) = result {
            report_failure(input, &e);
            failed = true;
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn save_stages(stages: &PipelineStages, events: &MemorySink, input: &Path, output_dir: &Path) -> Result<()> {
    use std::fs;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    // Stage 1: Raw extracted text
    let raw_path = output_dir.join("stage1_raw_text.txt");
    fs::write(&raw_path, stages.raw_text())?;
    tracing::info!(path = %raw_path.display(), chars = stages.raw_text().chars().count(), "saved stage");

    // Stage 2: Light-normalized text
    let cleaned_path = output_dir.join("stage2_cleaned_text.txt");
    fs::write(&cleaned_path, &stages.cleaned_text)?;
    tracing::info!(path = %cleaned_path.display(), chars = stages.cleaned_text.chars().count(), "saved stage");

    // Stage 3: Segmentation
    let segmentation_path = output_dir.join("stage3_segmentation.json");
    fs::write(&segmentation_path, serde_json::to_string_pretty(&stages.segmentation)?)?;
    tracing::info!(path = %segmentation_path.display(), questions = stages.batch().len(), "saved stage");

    // Events emitted during the run
    let events_path = output_dir.join("events.json");
    fs::write(&events_path, serde_json::to_string_pretty(&events.events())?)?;

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "input": input.display().to_string(),
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "extraction_method": stages.extraction.method,
        "page_count": stages.extraction.page_count,
        "stage_counts": {
            "raw_chars": stages.raw_text().chars().count(),
            "cleaned_chars": stages.cleaned_text.chars().count(),
            "blocks": stages.segmentation.blocks,
            "questions": stages.batch().len(),
        },
        "strategy": stages.segmentation.strategy,
    });
    let summary_path = output_dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    tracing::info!(path = %summary_path.display(), "saved summary");

    Ok(())
}

fn check_tools(config: &PipelineConfig) -> ExitCode {
    let locator = ToolLocator::from_env();
    let statuses = locator.check_ocr_tools(&config.ocr);

    for status in &statuses {
        match (&status.resolved, &status.version, &status.error) {
            (Some(path), Some(version), None) => {
                println!("ok       {:<10} {} ({})", status.name, path.display(), version)
            }
            (_, _, Some(error)) => println!("missing  {:<10} {}", status.name, error),
            _ => println!("unknown  {:<10}", status.name),
        }
    }

    if statuses.iter().all(|s| s.is_available()) {
        ExitCode::SUCCESS
    } else {
        println!("\nOCR needs poppler-utils (pdftoppm) and tesseract-ocr. Set ocr.pdftoppm_path / ocr.tesseract_path if they are not on PATH.");
        ExitCode::FAILURE
    }
}

fn show_help() -> Result<()> {
    println!("Available Configuration Options:");
    println!("  --config <path>         Load custom config file (default: user config dir, then built-in defaults)");
    println!("  --input <path>...       Documents to process: .pdf, .docx, .jpg, .jpeg, .png");
    println!("  --output <path>         Output file (directory when several inputs are given)");
    println!("  --output-format <fmt>   Output format: report, flat, or text");
    println!("  --analyze               Add placeholder question-type labels and topic terms");
    println!("  --clean <mode>          Print normalized text (light or aggressive) instead of questions");
    println!("  --dump-stages           Write every intermediate stage to --stages-dir");
    println!("  --check-tools           Verify pdftoppm and tesseract are installed");

    println!("\nOutput Formats:");
    println!("  report  - Full JSON: document provenance, questions with choices, optional analysis (default)");
    println!("  flat    - JSON list of question texts only");
    println!("  text    - Numbered listing for reading");

    if let Some(path) = ToolLocator::default_config_path() {
        println!("\nUser config file: {}", path.display());
    }

    println!("\nDefault configuration:");
    println!("{}", PipelineConfig::default().to_yaml()?);

    println!("Usage Examples:");
    println!("  qextract -i exam.pdf");
    println!("  qextract -i exam.docx -f text --stdout");
    println!("  qextract -i a.pdf b.png c.docx -o results/ --analyze");
    println!("  qextract -i scan.pdf --dump-stages --stages-dir stages/");
    Ok(())
}
