//! EPUB Translator CLI - Command line tool for translating Arabic EPUB books.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use epub_translator_core::{
    AppConfig, BookTranslator, ChunkStrategy, EpubBook, Lang, PromptMode, Stats, TranslatedChunk,
    chunk, clear_translation_cache, output, text,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeOption {
    Chat,
    Completion,
}

impl From<ModeOption> for PromptMode {
    fn from(opt: ModeOption) -> Self {
        match opt {
            ModeOption::Chat => Self::Chat,
            ModeOption::Completion => Self::Completion,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyOption {
    Sentences,
    Paragraphs,
}

impl From<StrategyOption> for ChunkStrategy {
    fn from(opt: StrategyOption) -> Self {
        match opt {
            StrategyOption::Sentences => Self::Sentences,
            StrategyOption::Paragraphs => Self::Paragraphs,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatOption {
    /// Numbered original and translation blocks
    Text,
    /// One {"source", "target"} object per line
    Jsonl,
}

impl FormatOption {
    const fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Jsonl => "jsonl",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "epub-translate")]
#[command(author, version, about = "Translate Arabic EPUB books chunk by chunk", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// OpenAI-compatible API base URL of the model server
    #[arg(long, global = true, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// API key
    #[arg(long, global = true, env = "OPENAI_API_KEY")]
    api_key: Option<String>,

    /// Model name
    #[arg(long, global = true, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Prompt style sent to the model
    #[arg(long, global = true, value_enum)]
    mode: Option<ModeOption>,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable caching
    #[arg(long, global = true)]
    no_cache: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count the chunks of a book
    Scan {
        /// Input EPUB file
        input: PathBuf,

        /// How the book is cut into chunks
        #[arg(long, value_enum)]
        strategy: Option<StrategyOption>,

        /// List every chunk with a preview
        #[arg(long)]
        list: bool,

        /// Preview length in characters
        #[arg(long, default_value_t = 60)]
        preview: usize,
    },

    /// Translate one chunk
    Translate {
        /// Input EPUB file
        input: PathBuf,

        /// Chunk number (starting at 1)
        #[arg(short = 'n', long)]
        chunk: usize,

        #[command(flatten)]
        lang: LangArg,

        /// Ignore cached translations
        #[arg(long)]
        force: bool,
    },

    /// Prompt for chunk numbers and translate them one at a time
    Interactive {
        /// Input EPUB file
        input: PathBuf,

        #[command(flatten)]
        lang: LangArg,
    },

    /// Translate every chunk and write the result to a file
    All {
        /// Input EPUB file
        input: PathBuf,

        #[command(flatten)]
        lang: LangArg,

        /// Output file (default: input-<lang>.txt or .jsonl)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "text")]
        format: FormatOption,

        /// Requests in flight at once
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },

    /// Translate plain Arabic text
    Text {
        /// Text to translate
        #[arg(long, conflicts_with = "input_file", required_unless_present = "input_file")]
        text: Option<String>,

        /// Read the text from a file
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// Write the table to a file instead of stdout
        #[arg(long)]
        output_file: Option<PathBuf>,

        #[command(flatten)]
        lang: LangArg,

        /// Sentences translated at once
        #[arg(long, default_value_t = 4)]
        batch_size: usize,
    },

    /// Delete all cached translations
    ClearCache,
}

#[derive(ClapArgs, Debug)]
struct LangArg {
    /// Target language (default from config: Indonesian)
    #[arg(short = 't', long = "lang")]
    lang: Option<String>,
}

impl LangArg {
    fn resolve(&self, config: &AppConfig) -> Lang {
        self.lang
            .as_deref()
            .map_or_else(|| Lang::from(config.target_language), Lang::from)
    }
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .context(format!("Failed to open log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(())
}

/// Config file (or the default layered sources) with CLI overrides on top
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load().context("Failed to load configuration")?
    };

    if let Some(ref api_base) = args.api_base {
        config.translator.api_base.clone_from(api_base);
    }
    if args.api_key.is_some() {
        config.translator.api_key.clone_from(&args.api_key);
    }
    if let Some(ref model) = args.model {
        config.translator.model.clone_from(model);
    }
    if let Some(mode) = args.mode {
        config.translator.mode = mode.into();
    }
    if args.no_cache {
        config.cache.enabled = false;
    }

    Ok(config)
}

fn load_book(input: &Path) -> Result<EpubBook> {
    info!("Loading EPUB: {}", input.display());
    EpubBook::from_file(input).context(format!("Failed to load EPUB: {}", input.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose, args.log_file.as_deref())?;

    let mut config = load_config(&args)?;

    match args.command {
        Command::Scan {
            input,
            strategy,
            list,
            preview,
        } => {
            if let Some(strategy) = strategy {
                config.extraction.strategy = strategy.into();
            }
            run_scan(&config, &input, list, preview)
        }
        Command::Translate {
            input,
            chunk,
            lang,
            force,
        } => {
            let target = lang.resolve(&config);
            run_translate(config, &input, chunk, &target, force).await
        }
        Command::Interactive { input, lang } => {
            let target = lang.resolve(&config);
            run_interactive(config, &input, &target).await
        }
        Command::All {
            input,
            lang,
            output,
            format,
            concurrency,
        } => {
            let target = lang.resolve(&config);
            let output_path = output.unwrap_or_else(|| default_output_path(&input, &target, format));
            run_all(config, &input, &target, &output_path, format, concurrency).await
        }
        Command::Text {
            text,
            input_file,
            output_file,
            lang,
            batch_size,
        } => {
            let target = lang.resolve(&config);
            let input_text = match (text, input_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .context(format!("Failed to read input: {}", path.display()))?,
                (None, None) => anyhow::bail!("Provide --text or --input-file"),
            };
            run_text(config, &input_text, output_file.as_deref(), &target, batch_size).await
        }
        Command::ClearCache => run_clear_cache(&config),
    }
}

#[allow(clippy::print_stdout)]
fn run_scan(config: &AppConfig, input: &Path, list: bool, preview: usize) -> Result<()> {
    let book = load_book(input)?;
    let chunks = chunk::scan(&book, &config.extraction);

    if let Some(ref title) = book.metadata().title {
        println!("Title: {title}");
    }
    println!("Size: {} bytes", book.size());
    println!("Total chunks: {}", chunks.len());

    if list {
        for (number, text) in chunks.iter() {
            println!("{:>5}  {}", number, text::preview(text, preview));
        }
    }

    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_chunk(result: &TranslatedChunk, total: usize) {
    println!(
        "Chunk {}/{}{}",
        result.number,
        total,
        if result.from_cache { " (cached)" } else { "" }
    );
    println!("\nOriginal:\n{}", result.original);
    println!("\nTranslation:\n{}\n", result.translation);
}

async fn run_translate(
    config: AppConfig,
    input: &Path,
    number: usize,
    target: &Lang,
    force: bool,
) -> Result<()> {
    let book = load_book(input)?;
    let translator = BookTranslator::new(config).context("Failed to initialize translator")?;
    let chunks = translator.scan(&book).await;

    let result = if force {
        translator.translate_chunk_force(&chunks, number, target).await
    } else {
        translator.translate_chunk(&chunks, number, target).await
    }
    .context(format!("Failed to translate chunk {number}"))?;

    print_chunk(&result, chunks.len());
    Ok(())
}

#[allow(clippy::print_stdout)]
async fn run_interactive(config: AppConfig, input: &Path, target: &Lang) -> Result<()> {
    let book = load_book(input)?;
    let chunks = chunk::scan(&book, &config.extraction);
    let total = chunks.len();

    println!("Total chunks: {total}");
    if chunks.is_empty() {
        return Ok(());
    }

    // Built on the first valid chunk number so browsing needs no backend
    let slot = tokio::sync::OnceCell::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("Enter chunk number (1-{total}) or 'q' to quit: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            break;
        }

        let number = match line.parse::<usize>() {
            Ok(n) if (1..=total).contains(&n) => n,
            _ => {
                println!("Please enter a number between 1 and {total}.");
                continue;
            }
        };

        let translator = slot
            .get_or_try_init(|| async { BookTranslator::new(config.clone()) })
            .await
            .context("Failed to initialize translator")?;

        match translator.translate_chunk(&chunks, number, target).await {
            Ok(result) => print_chunk(&result, total),
            Err(e) => println!("Translation failed: {e}"),
        }
    }

    Ok(())
}

fn default_output_path(input: &Path, target: &Lang, format: FormatOption) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{}-{}.{}", stem, target.slug(), format.extension()))
}

async fn run_all(
    config: AppConfig,
    input: &Path,
    target: &Lang,
    output_path: &Path,
    format: FormatOption,
    concurrency: usize,
) -> Result<()> {
    let book = load_book(input)?;
    let translator = BookTranslator::new(config).context("Failed to initialize translator")?;
    let chunks = translator.scan(&book).await;

    if chunks.is_empty() {
        anyhow::bail!("No translatable text found in {}", input.display());
    }

    info!("Translating {} chunks to {}", chunks.len(), target);

    // Setup progress bar
    #[allow(clippy::cast_possible_truncation)]
    let pb = ProgressBar::new(chunks.len() as u64);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let bar = pb.clone();
    let results = translator
        .translate_all(
            &chunks,
            target,
            concurrency,
            Some(Box::new(move |done, _total| bar.set_position(done as u64))),
        )
        .await
        .context("Translation failed")?;

    pb.finish_with_message("Translation complete");

    let file = File::create(output_path)
        .context(format!("Failed to create output: {}", output_path.display()))?;
    let writer = BufWriter::new(file);
    let written = match format {
        FormatOption::Text => output::write_bilingual_text(&results, writer),
        FormatOption::Jsonl => output::write_jsonl(&results, writer),
    };
    written.context(format!("Failed to write output: {}", output_path.display()))?;

    let cached = results.iter().filter(|r| r.from_cache).count();

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!(
            "Translated {} chunks ({} from cache) saved to: {}",
            results.len(),
            cached,
            output_path.display()
        );
    }

    Ok(())
}

#[allow(clippy::print_stdout)]
async fn run_text(
    config: AppConfig,
    input_text: &str,
    output_file: Option<&Path>,
    target: &Lang,
    batch_size: usize,
) -> Result<()> {
    let translator = BookTranslator::new(config).context("Failed to initialize translator")?;

    let start = Instant::now();
    let results = translator
        .translate_text(input_text, target, batch_size)
        .await
        .context("Translation failed")?;
    let stats = Stats::new(results.len(), start.elapsed());

    let table = output::format_table(&results);
    if let Some(path) = output_file {
        std::fs::write(path, &table)
            .context(format!("Failed to write output: {}", path.display()))?;
        println!("Translation saved to: {}", path.display());
    } else {
        println!("\nTranslation result:");
        println!("{table}");
    }

    println!("\n{stats}");
    Ok(())
}

#[allow(clippy::print_stdout)]
fn run_clear_cache(config: &AppConfig) -> Result<()> {
    let dir = config.cache.resolved_dir();
    let removed = clear_translation_cache(&dir)
        .context(format!("Failed to clear cache in {}", dir.display()))?;
    println!("Removed {} cached translation files from {}", removed, dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_parse_subcommands() {
        Args::command().debug_assert();

        let args = Args::parse_from([
            "epub-translate",
            "-vv",
            "translate",
            "book.epub",
            "--chunk",
            "3",
            "--lang",
            "English",
        ]);
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Translate { chunk, lang, force, .. } => {
                assert_eq!(chunk, 3);
                assert_eq!(lang.lang.as_deref(), Some("English"));
                assert!(!force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_text_requires_input() {
        assert!(Args::try_parse_from(["epub-translate", "text"]).is_err());
        assert!(
            Args::try_parse_from(["epub-translate", "text", "--text", "a", "--input-file", "b"])
                .is_err()
        );
        assert!(Args::try_parse_from(["epub-translate", "text", "--text", "نص"]).is_ok());
    }

    #[test]
    fn test_default_output_path() {
        let path = default_output_path(
            Path::new("/books/kitab.epub"),
            &Lang::new("Bahasa Indonesia"),
            FormatOption::Jsonl,
        );
        assert_eq!(path, PathBuf::from("/books/kitab-bahasa-indonesia.jsonl"));
    }

    #[test]
    fn test_lang_falls_back_to_config() {
        let config = AppConfig::default();
        let arg = LangArg { lang: None };
        assert_eq!(arg.resolve(&config).as_str(), "Indonesian");
    }
}
