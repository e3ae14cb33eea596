use clap::{Parser, Subcommand};
use std::path::PathBuf;
use swifty::config::{self, ConfigResolver, ProjectPaths};
use swifty::storage::FsStorage;
use swifty::{generate, output, scan};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "swifty")]
#[command(about = "Static site generator for folders of markdown")]
#[command(long_about = "\
Static site generator for folders of markdown

The pages directory is the site. Folders become listing pages, documents
become pages, and settings files cascade from the project root down.

Project structure:

  site/
  ├── config.yaml                  # Project settings (optional)
  ├── index.html                   # Landing document template (optional)
  ├── layouts/post.html            # Layouts, selected with `layout: post`
  ├── partials/footer.md           # Included with {{partial: footer}}
  ├── css/ js/ images/             # Copied to the output unchanged
  └── pages/
      ├── index.md                 # Landing page (required)
      ├── about.md                 # → /about.html
      └── blog/
          ├── config.yaml          # Settings for blog/ (overrides parent)
          └── post-one.md          # → /blog/post-one.html

Document front matter overrides every settings file for that document.
Tags declared with `tags: [a, b]` get listing pages under /tags/, so once
any document has tags the pages root cannot hold its own tags.md or tags/.

Run 'swifty gen-config' to print a documented config.yaml.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Pages directory, relative to the root
    #[arg(long, default_value = "pages", global = true)]
    source: PathBuf,

    /// Output directory, relative to the root
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Log progress (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site: copy assets, build the page tree, write HTML
    Build {
        /// Worker threads for building and rendering (default: all cores)
        #[arg(long, short)]
        jobs: Option<usize>,
    },
    /// Build the page tree without writing anything and print it
    Check,
    /// Print a stock config.yaml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let paths = ProjectPaths::new(&cli.root)
        .with_pages(&cli.source)
        .with_output(&cli.output);
    let storage = FsStorage::new();

    match cli.command {
        Command::Build { jobs } => {
            init_thread_pool(jobs);
            println!("==> Building {}", paths.pages.display());
            let report = generate::generate(&storage, &paths)?;
            output::print_generate_output(&report, &paths.output);
            println!("==> Build complete: {}", paths.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", paths.pages.display());
            let resolver = ConfigResolver::load(&storage, &paths.root)?;
            let site = scan::build(&storage, &paths.pages, &resolver)?;
            output::print_check_output(&site, &paths.pages);
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_yaml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(jobs: Option<usize>) {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let threads = jobs.map(|j| j.clamp(1, cores)).unwrap_or(cores);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
