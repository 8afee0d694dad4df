use clap::{Parser, Subcommand};
use simple_deck::{config, generate, output, render, scan};
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;

/// Shared flags for commands that render diagrams.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Disable the diagram cache and recompile every diagram
    #[arg(long)]
    no_cache: bool,
}

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "simple-deck")]
#[command(about = "Static generator for markdown slide decks")]
#[command(long_about = "\
Static generator for markdown slide decks

Every markdown file is a slide. Numbered files form the deck in number
order; unnumbered files get their own page outside the sequence.

Content structure:

  content/
  ├── config.toml              # Deck config (optional)
  ├── 010-introduction.md      # Slide 1
  ├── 020-how-it-works.md      # Slide 2
  └── speaker-notes.md         # Own page, not in the deck

Code blocks:
  ```python ... ```   highlighted, with line numbers
  ```mermaid ... ```  compiled to an inline SVG diagram
  ``` ... ```         plain preformatted text

Run 'simple-deck gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (manifests, diagram cache)
    #[arg(long, default_value = ".simple-deck-temp", global = true)]
    temp_dir: PathBuf,

    /// Log debug detail to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the content directory into a deck manifest
    Scan,
    /// Render slide markdown, code and diagrams to HTML
    Render(CacheArgs),
    /// Produce the final HTML pages from rendered slides
    Generate,
    /// Run the full pipeline: scan → render → generate
    Build(CacheArgs),
    /// Validate the content directory without building
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Scan => {
            let manifest = scan::scan(&cli.source)?;
            std::fs::create_dir_all(&cli.temp_dir)?;
            let json = serde_json::to_string_pretty(&manifest)?;
            std::fs::write(cli.temp_dir.join("manifest.json"), json)?;
            output::print_scan_output(&manifest, has_config_file(&cli.source));
        }
        Command::Render(cache_args) => {
            let manifest_path = cli.temp_dir.join("manifest.json");
            let manifest_content = std::fs::read_to_string(&manifest_path)?;
            let manifest: scan::DeckManifest = serde_json::from_str(&manifest_content)?;
            init_thread_pool(&manifest.config.processing);
            run_render(&cli.temp_dir, &cache_args)?;
        }
        Command::Generate => {
            let pages = generate::generate(&cli.temp_dir.join("rendered.json"), &cli.output)?;
            output::print_generate_output(&pages);
        }
        Command::Build(cache_args) => {
            std::fs::create_dir_all(&cli.temp_dir)?;

            println!("==> Stage 1: Scanning {}", cli.source.display());
            let manifest = scan::scan(&cli.source)?;
            let json = serde_json::to_string_pretty(&manifest)?;
            std::fs::write(cli.temp_dir.join("manifest.json"), json)?;
            output::print_scan_output(&manifest, has_config_file(&cli.source));

            println!("==> Stage 2: Rendering slides");
            init_thread_pool(&manifest.config.processing);
            run_render(&cli.temp_dir, &cache_args)?;

            println!("==> Stage 3: Generating HTML → {}", cli.output.display());
            let pages = generate::generate(&cli.temp_dir.join("rendered.json"), &cli.output)?;
            output::print_generate_output(&pages);

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let manifest = scan::scan(&cli.source)?;
            output::print_scan_output(&manifest, has_config_file(&cli.source));
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Stage 2: render `manifest.json` into `rendered.json`, printing progress.
fn run_render(temp_dir: &Path, cache_args: &CacheArgs) -> Result<(), Box<dyn std::error::Error>> {
    let manifest_path = temp_dir.join("manifest.json");
    let cache_dir = temp_dir.join("diagrams");
    let cache_dir = (!cache_args.no_cache).then_some(cache_dir.as_path());

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_render_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = render::render(&manifest_path, cache_dir, Some(tx));
    // The sender is gone once render returns, so the printer drains and exits
    printer
        .join()
        .map_err(|_| "render progress printer panicked")?;
    let result = result?;

    let json = serde_json::to_string_pretty(&result.deck)?;
    std::fs::write(temp_dir.join("rendered.json"), json)?;
    for line in output::format_render_summary(&result.deck, result.cache_stats.as_ref()) {
        println!("{}", line);
    }
    Ok(())
}

/// Structured logs go to stderr; stdout carries the stage output.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "simple_deck=debug"
    } else {
        "simple_deck=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    tracing::debug!(threads, "initializing render thread pool");
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn has_config_file(source: &Path) -> bool {
    source.join("config.toml").exists()
}
