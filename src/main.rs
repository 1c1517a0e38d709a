use clap::{Parser, Subcommand};
use postmill::cache::CacheManifest;
use postmill::capitalize::Capitalizer;
use postmill::collection::PostCollection;
use postmill::highlight::SyntectHighlighter;
use postmill::toc::render_outline;
use postmill::transform::{TransformContext, build_outline};
use postmill::{config, frontmatter, output, pipeline, scan};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that compile the site.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Disable the compile cache and recompile every post
    #[arg(long)]
    no_cache: bool,
}

#[derive(Parser)]
#[command(name = "postmill")]
#[command(about = "Compile MDX blog posts into structured records")]
#[command(long_about = "\
Compile MDX blog posts into structured records

Your filesystem is the data source. The first directory names the locale,
the next one the folder, and the file name is the slug.

Content structure:

  content/
  ├── config.toml                  # Site config (optional)
  ├── en/                          # Locale (must be listed in locales.allowed)
  │   └── tech/                    # Folder
  │       └── scaling-llms.mdx     # → /posts/scaling-llms
  ├── ar/
  │   └── tech/
  │       └── scaling-llms.mdx     # Same slug, another locale
  └── tech/
      └── legacy-post.mdx          # No locale folder = default locale

Each post starts with YAML front matter (title, description, date required;
lastUpdated, archived, tags optional).

Run 'postmill gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Log compile progress (same as RUST_LOG=postmill=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile every post and write posts.json
    Build(CacheArgs),
    /// Compile every post without writing anything
    Check,
    /// Print the table of contents of one post
    Toc {
        /// Post source file
        file: PathBuf,
        /// Print the outline as a nested HTML list instead
        #[arg(long)]
        html: bool,
    },
    /// Print the raw markdown body of a post (reads posts.json when built)
    Raw {
        /// Post slug (file name without extension)
        slug: String,
        /// Locale to look in (defaults to the site's default locale)
        #[arg(long)]
        locale: Option<String>,
    },
    /// Print sitemap entries for a locale as JSON (reads posts.json when built)
    Sitemap {
        /// Locale to list (defaults to the site's default locale)
        #[arg(long)]
        locale: Option<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Build(cache_args) => {
            let site_config = config::load_config(&cli.source)?;
            init_thread_pool(&site_config.processing);
            let highlighter = SyntectHighlighter::new(&site_config.highlight)?;
            let ctx = TransformContext::new(&site_config, &highlighter);

            println!("==> Stage 1: Scanning {}", cli.source.display());
            let content = scan::scan(&cli.source, &site_config)?;

            println!("==> Stage 2: Compiling {} posts", content.sources.len());
            let mut cache = if cache_args.no_cache {
                CacheManifest::empty()
            } else {
                CacheManifest::load(&cli.output)
            };
            let report = pipeline::build_content(content, &ctx, Some(&mut cache));
            output::print_build_report(&report);

            let posts_path = pipeline::write_posts_json(&cli.output, &report.posts)?;
            cache.save(&cli.output)?;
            println!("==> Wrote {}", posts_path.display());

            if !report.is_clean() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Check => {
            let site_config = config::load_config(&cli.source)?;
            init_thread_pool(&site_config.processing);
            let highlighter = SyntectHighlighter::new(&site_config.highlight)?;
            let ctx = TransformContext::new(&site_config, &highlighter);

            println!("==> Checking {}", cli.source.display());
            let content = scan::scan(&cli.source, &site_config)?;
            let report = pipeline::build_content(content, &ctx, None);
            output::print_build_report(&report);

            if !report.is_clean() {
                return Ok(ExitCode::FAILURE);
            }
            println!("==> Content is valid");
        }
        Command::Toc { file, html } => {
            let site_config = config::load_config(&cli.source)?;
            let capitalizer = Capitalizer::from_config(&site_config.capitalization);
            let source = std::fs::read_to_string(&file)?;
            let (_, body) = frontmatter::parse(&source)?;
            let toc = build_outline(body, &capitalizer);
            if html {
                if let Some(markup) = render_outline(&toc) {
                    println!("{}", markup.into_string());
                }
            } else {
                output::print_toc(&toc);
            }
        }
        Command::Raw { slug, locale } => {
            let site_config = config::load_config(&cli.source)?;
            let collection = load_collection(&cli.source, &cli.output, &site_config)?;
            let locale = locale.unwrap_or_else(|| site_config.locales.default.clone());
            let fallback = site_config
                .raw_markdown
                .fallback_to_default_locale
                .then_some(site_config.locales.default.as_str());
            match collection.raw_markdown(&slug, &locale, fallback) {
                Ok(response) => print!("{}", response.body),
                Err(err) => {
                    output::print_not_found(&err);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Sitemap { locale } => {
            let site_config = config::load_config(&cli.source)?;
            let collection = load_collection(&cli.source, &cli.output, &site_config)?;
            let locale = locale.unwrap_or_else(|| site_config.locales.default.clone());
            let entries = collection.sitemap_entries(&locale, &site_config.urls.base_url);
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Posts from the last `build`, or the site compiled in memory when the
/// output directory has no `posts.json` yet.
///
/// The cache is only read here; `build` is the command that writes it.
fn load_collection(
    source: &Path,
    output_dir: &Path,
    site_config: &config::SiteConfig,
) -> Result<PostCollection, Box<dyn std::error::Error>> {
    if let Some(posts) = pipeline::load_posts(output_dir)? {
        tracing::debug!(output = %output_dir.display(), count = posts.len(), "using built posts");
        return Ok(PostCollection::new(posts));
    }

    init_thread_pool(&site_config.processing);
    let highlighter = SyntectHighlighter::new(&site_config.highlight)?;
    let ctx = TransformContext::new(site_config, &highlighter);
    let content = scan::scan(source, site_config)?;
    let mut cache = CacheManifest::load(output_dir);
    let report = pipeline::build_content(content, &ctx, Some(&mut cache));
    for diag in &report.diagnostics {
        tracing::warn!(path = %diag.path, error = %diag.error, "skipping post");
    }
    Ok(PostCollection::new(report.posts))
}

/// Initialise tracing-based logging on stderr.
///
/// Uses `RUST_LOG` if set, otherwise `warn` (or `postmill=debug` with `--verbose`).
fn init_logging(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("postmill=debug")
    } else {
        EnvFilter::new("warn")
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Never more threads than available cores; the config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
