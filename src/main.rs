use blog_media::cache::CacheManifest;
use blog_media::imaging::{RustBackend, Width};
use blog_media::page::PageContext;
use blog_media::shortcode::{ImageRequest, ImageShortcode};
use blog_media::{config, output, site};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared flags for commands that encode images.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Disable the variant cache and re-encode every image
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
#[command(name = "blog-media")]
#[command(about = "Build-time media shortcodes for a markdown blog")]
#[command(long_about = "\
Build-time media shortcodes for a markdown blog

Markdown pages are rendered to HTML. Media shortcodes inside them are
expanded at build time:

  {% image \"cat.jpg\", \"A cat\", [600, 1200], \"(min-width: 40em) 50vw\" %}
  {% video \"walk.mp4\", \"Evening walk\" %}

Images become <picture> markup with one variant per width and format.
Videos are copied to the output and load lazily in the browser. Every
code block gets a copy-to-clipboard button.

Content structure:

  content/
  ├── config.toml          # Site config (optional)
  ├── index.md             # → index.html
  ├── about.md             # → about/index.html
  └── posts/
      ├── hello.md         # → posts/hello/index.html
      └── hello.png        # Referenced relative to the page

Run 'blog-media gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "_site", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render every page and generate its media
    Build(CacheArgs),
    /// Validate every page's shortcodes without writing anything
    Check,
    /// Generate variants for one image and print its markup
    Image(ImageArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct ImageArgs {
    /// Image path, relative to the page (or to the content root with a leading `/`)
    src: String,

    /// Alternative text
    #[arg(long, default_value = "")]
    alt: String,

    /// Comma-separated widths in pixels, or `auto`
    #[arg(long, value_delimiter = ',')]
    widths: Vec<Width>,

    /// Value for the `sizes` attribute
    #[arg(long)]
    sizes: Option<String>,

    /// Figure caption
    #[arg(long)]
    caption: Option<String>,

    /// Page the image belongs to [default: <source>/index.md]
    #[arg(long)]
    page: Option<PathBuf>,

    #[command(flatten)]
    cache: CacheArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build(cache_args) => {
            let site_config = config::load_config(&cli.source)?;
            init_thread_pool(&site_config.processing);

            println!("==> Building {} → {}", cli.source.display(), cli.output.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_build_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = site::build(
                &cli.source,
                &cli.output,
                &site_config,
                !cache_args.no_cache,
                Some(tx),
            );
            printer.join().map_err(|_| "output thread panicked")?;
            output::print_build_summary(&result?);

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            let site_config = config::load_config(&cli.source)?;
            println!("==> Checking {}", cli.source.display());
            let pages = site::check(&cli.source, &cli.output, &site_config)?;
            output::print_check_output(&pages, &cli.source);
            println!("==> Content is valid");
        }
        Command::Image(args) => {
            let site_config = config::load_config(&cli.source)?;
            init_thread_pool(&site_config.processing);
            run_image(&cli.source, &cli.output, &site_config, args)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Build a single image shortcode outside of any page render.
fn run_image(
    source: &Path,
    site_output: &Path,
    site_config: &config::SiteConfig,
    args: ImageArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let image_dir = site_config.pipeline(site_output).output_dir;
    let manifest = if args.cache.no_cache {
        CacheManifest::empty()
    } else {
        CacheManifest::load(&image_dir)
    };
    let cache = Arc::new(Mutex::new(manifest));
    let shortcode =
        ImageShortcode::new(RustBackend::new(), site_config, site_output).with_cache(cache.clone());

    let page_path = args.page.unwrap_or_else(|| source.join("index.md"));
    let page = PageContext::new(&page_path, source);
    let request = ImageRequest {
        source: args.src,
        alt: args.alt,
        widths: args.widths,
        sizes: args.sizes,
        caption: args.caption,
    };

    let result = shortcode.build(&page, &request)?;
    let rendered = shortcode.present(&request, &result);
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .save(&image_dir)?;

    output::print_image_output(&request.source, &result, &rendered);
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
