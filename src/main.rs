use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use mupdf_generator::generator::{
    FileCredentialStore, Generator, MetaDataQuery, MetaDataValue, OpenResult, PageInfo,
    PasswordReply, PixmapRequest, PromptKind, StoreBackedCredentials, Synopsis,
};
use mupdf_generator::panic_handler::initialize_panic_handler;
use mupdf_generator::pdf::{Document, LinkDestination};
use mupdf_generator::settings;

#[derive(Parser)]
#[command(name = "mupdf-generator")]
#[command(version)]
#[command(about = "Inspect and render PDF files through MuPDF", long_about = None)]
struct Cli {
    /// Password for encrypted documents (prompted for when missing)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Remember passwords entered at the prompt
    #[arg(long, global = true)]
    remember: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write the log to a file instead of stderr
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show document information
    Info {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print the table of contents
    Outline {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print the text of a page
    Text {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// One-based page number
        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Render a page to PNG
    Render(RenderArgs),

    /// Resolve a `src:<line><file>` reference to a page position
    Sync {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(value_name = "REFERENCE")]
        reference: String,
    },
}

#[derive(Args)]
struct RenderArgs {
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// One-based page number
    #[arg(short, long, default_value = "1")]
    page: usize,

    /// Output width in pixels
    #[arg(long, requires = "height", conflicts_with = "dpi")]
    width: Option<u32>,

    /// Output height in pixels
    #[arg(long, requires = "width", conflicts_with = "dpi")]
    height: Option<u32>,

    /// Resolution when no pixel size is given (defaults to the configured one)
    #[arg(long)]
    dpi: Option<f32>,

    /// PNG file to write
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,
}

fn main() -> Result<()> {
    initialize_panic_handler();
    let cli = Cli::parse();

    settings::load_settings();
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let generator = Generator::new(Document::new());
    match &cli.command {
        Commands::Info { input } => {
            open(&generator, input, &cli)?;
            print_info(&generator)?;
        }
        Commands::Outline { input } => {
            open(&generator, input, &cli)?;
            match generator.generate_document_synopsis() {
                Some(synopsis) => print_synopsis(&synopsis),
                None => println!("(no outline)"),
            }
        }
        Commands::Text { input, page } => {
            let pages = open(&generator, input, &cli)?;
            let index = page_index(*page, &pages)?;
            let text = generator
                .text_page(index)
                .map(|tp| tp.text())
                .unwrap_or_default();
            print!("{text}");
        }
        Commands::Render(args) => {
            let pages = open(&generator, &args.input, &cli)?;
            render(&generator, &pages, args)?;
        }
        Commands::Sync { input, reference } => {
            open(&generator, input, &cli)?;
            if !generator.has_source_sync() {
                println!("No source sync data available for {}", input.display());
                return Ok(());
            }
            match generator.meta_data(&MetaDataQuery::NamedViewport(reference.clone())) {
                Some(MetaDataValue::Viewport(viewport)) => {
                    print!("page {}", viewport.page + 1);
                    if let Some(pos) = viewport.position {
                        print!(" at ({:.3}, {:.3})", pos.normalized_x, pos.normalized_y);
                    }
                    println!();
                }
                _ => println!("No match for {reference}"),
            }
        }
    }

    generator.close_document();
    Ok(())
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => settings::get_log_level()
            .parse()
            .unwrap_or(LevelFilter::Info),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    match log_file {
        Some(path) => WriteLogger::init(
            level,
            Config::default(),
            File::create(path).with_context(|| format!("cannot create log file {path:?}"))?,
        )?,
        None => TermLogger::init(
            level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )?,
    }
    Ok(())
}

fn open(generator: &Generator, input: &Path, cli: &Cli) -> Result<Vec<PageInfo>> {
    if let Some(password) = &cli.password {
        return match generator.load_document_with_password(input, password) {
            OpenResult::Success(pages) => Ok(pages),
            OpenResult::NeedsPassword => bail!("wrong password for {}", input.display()),
            OpenResult::Error(e) => Err(e).with_context(|| format!("opening {}", input.display())),
        };
    }

    let store = settings::is_remember_passwords().then(|| {
        FileCredentialStore::load_or_ephemeral(settings::get_credential_file().as_deref())
            .in_folder(&settings::get_credential_folder())
    });
    let remember = cli.remember;
    let mut provider = StoreBackedCredentials::new(store, |kind, can_keep| {
        prompt_password(kind).map(|password| PasswordReply {
            password,
            keep: remember && can_keep,
        })
    });

    let pages = generator
        .load_document(input, &mut provider)
        .with_context(|| format!("opening {}", input.display()))?;
    info!("{} pages", pages.len());
    Ok(pages)
}

/// Ask on stderr, read one line from stdin; `None` on EOF
fn prompt_password(kind: PromptKind) -> Option<String> {
    eprint!("{}\n{} ", PromptKind::CAPTION, kind.message());
    let _ = io::stderr().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
    }
}

fn page_index(page: usize, pages: &[PageInfo]) -> Result<usize> {
    if page == 0 || page > pages.len() {
        bail!("page {page} out of range (document has {} pages)", pages.len());
    }
    Ok(page - 1)
}

fn print_info(generator: &Generator) -> Result<()> {
    let info = generator.generate_document_info()?;
    for entry in info.entries() {
        let label = entry.title.unwrap_or(entry.key.as_str());
        if !entry.value.is_empty() {
            println!("{label:>10}: {}", entry.value);
        }
    }
    if let Some(MetaDataValue::Flag(true)) = generator.meta_data(&MetaDataQuery::StartFullScreen) {
        println!("{:>10}: full screen", "opens in");
    }
    if let Some(MetaDataValue::Flag(true)) = generator.meta_data(&MetaDataQuery::OpenTOC) {
        println!("{:>10}: outline", "opens in");
    }
    Ok(())
}

fn print_synopsis(synopsis: &Synopsis) {
    for (level, node) in synopsis.walk() {
        let target = match &node.destination {
            Some(LinkDestination::GoTo { page, .. }) => format!("p. {}", page + 1),
            Some(LinkDestination::Uri { uri, .. }) => uri.clone(),
            Some(LinkDestination::External { file_name, .. })
            | Some(LinkDestination::Launch { file_name, .. }) => file_name.clone(),
            Some(LinkDestination::Named { name }) => format!("#{name}"),
            None => String::new(),
        };
        let marker = if node.open { "-" } else { "+" };
        println!("{}{marker} {}  {target}", "  ".repeat(level), node.title);
    }
}

fn render(generator: &Generator, pages: &[PageInfo], args: &RenderArgs) -> Result<()> {
    let index = page_index(args.page, pages)?;
    let info = &pages[index];
    let (width, height) = match (args.width, args.height) {
        (Some(w), Some(h)) => (w, h),
        _ => {
            let dpi = f64::from(args.dpi.unwrap_or_else(settings::get_render_dpi));
            let px = |points: f64| (points * dpi / 72.0).round().max(1.0) as u32;
            (px(info.width), px(info.height))
        }
    };
    debug!("Rendering page {} at {width}x{height}", args.page);

    let image = generator.image(PixmapRequest {
        page: index,
        width,
        height,
    })?;
    if image.width() == 0 || image.height() == 0 {
        bail!("page {} could not be rendered", args.page);
    }
    image
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("{}", args.output.display());
    Ok(())
}
