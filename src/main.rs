use channel_archivist::{
    ArchivistError, ConfigInput, ProgressEvent, discover_channel, download_catalog, sync_channel,
};
use clap::{Args, Parser, Subcommand};
use humansize::{DECIMAL, format_size};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Mirror a video channel or playlist into a season/episode media library
#[derive(Debug, Parser)]
#[command(name = "channel-archivist", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Update the catalog and acquire every pending entry (default)
    Sync,
    /// Only update the catalog from the remote listing
    Discover,
    /// Only acquire pending entries of the existing catalog
    Download,
}

/// Settings, each also readable from the environment or a `.env` file
#[derive(Debug, Args)]
struct Settings {
    /// API key for the YouTube Data API
    #[arg(long, global = true, env = "YT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Channel to mirror (conflicts with a playlist)
    #[arg(long, global = true, env = "YT_CHANNEL_ID")]
    channel_id: Option<String>,

    /// Playlist to mirror (conflicts with a channel)
    #[arg(long, global = true, env = "YT_PLAYLIST_ID")]
    playlist_id: Option<String>,

    /// Display name of the show, used as the library folder
    #[arg(long, global = true, env = "YT_CHANNEL_NAME")]
    show_name: Option<String>,

    /// Year in which season one starts
    #[arg(long, global = true, env = "SEASON_START_YEAR")]
    season_start_year: Option<String>,

    /// Directory the show folder is created in [default: .]
    #[arg(long, global = true, env = "OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Catalog file [default: <output-dir>/<show-name>.json]
    #[arg(long, global = true, env = "CATALOG_PATH")]
    catalog_path: Option<PathBuf>,

    /// Seconds to wait between page requests [default: 5]
    #[arg(long, global = true, env = "PAGE_DELAY_SECS")]
    page_delay_secs: Option<u64>,

    /// Maximum number of listing pages per run [default: 50]
    #[arg(long, global = true, env = "MAX_PAGES")]
    max_pages: Option<usize>,

    /// yt-dlp executable [default: yt-dlp]
    #[arg(long, global = true, env = "YT_DLP_PATH")]
    yt_dlp_path: Option<PathBuf>,
}

impl From<Settings> for ConfigInput {
    fn from(settings: Settings) -> Self {
        ConfigInput {
            api_key: settings.api_key,
            channel_id: settings.channel_id,
            playlist_id: settings.playlist_id,
            show_name: settings.show_name,
            season_start_year: settings.season_start_year,
            output_dir: settings.output_dir,
            catalog_path: settings.catalog_path,
            page_delay: settings.page_delay_secs.map(Duration::from_secs),
            max_pages: settings.max_pages,
            yt_dlp_path: settings.yt_dlp_path,
        }
    }
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Started {
            show_name,
            catalog_path,
        } => {
            println!(
                "Archiving '{}' (catalog: {})",
                show_name,
                catalog_path.display()
            );
        }
        ProgressEvent::CatalogLoaded { entry_count } => {
            println!("Catalog holds {} entr(y/ies)", entry_count);
        }
        ProgressEvent::FetchingRemote => {
            println!("\n=== Discovering Videos ===");
        }
        ProgressEvent::RemoteFetched { item_count } => {
            println!("Found {} remote video(s)", item_count);
        }
        ProgressEvent::CatalogReconciled {
            new_entries,
            total_entries,
        } => {
            println!(
                "Added {} new entr(y/ies), {} in total",
                new_entries, total_entries
            );
        }
        ProgressEvent::ProcessingEntry {
            index,
            total,
            title,
        } => {
            if index == 0 {
                println!("\n=== Acquiring Episodes ===");
            }
            println!("[{}/{}] {}", index + 1, total, title);
        }
        ProgressEvent::EntryAlreadyComplete { .. } => {
            println!("  Already complete");
        }
        ProgressEvent::FolderCreated { path } => {
            println!("  Created {}", path.display());
        }
        ProgressEvent::SidecarWritten { .. } => {
            println!("  Wrote metadata sidecar");
        }
        ProgressEvent::SidecarFailed { error, .. } => {
            println!("  Metadata sidecar failed: {}", error);
        }
        ProgressEvent::DownloadingThumbnail { .. } => {
            println!("  Downloading thumbnail...");
        }
        ProgressEvent::ThumbnailSaved { bytes, .. } => {
            println!("  Thumbnail saved ({})", format_size(bytes, DECIMAL));
        }
        ProgressEvent::ThumbnailFailed { error, .. } => {
            println!("  Thumbnail failed: {}", error);
        }
        ProgressEvent::FormatsSelected {
            video_format,
            audio_format,
        } => {
            println!("  Formats: video {}, audio {}", video_format, audio_format);
        }
        ProgressEvent::DownloadingStream { kind, .. } => {
            println!("  Downloading {} stream...", kind);
        }
        ProgressEvent::StreamDownloaded { kind, bytes } => {
            println!("  {} stream done ({})", kind, format_size(bytes, DECIMAL));
        }
        ProgressEvent::Merging { .. } => {
            println!("  Merging streams...");
        }
        ProgressEvent::MediaSaved { path } => {
            println!("  Saved {}", path.display());
        }
        ProgressEvent::MediaFailed { error, .. } => {
            println!("  Failed: {}", error);
        }
        ProgressEvent::CheckpointFailed { path, error } => {
            eprintln!("Warning: could not save {}: {}", path.display(), error);
        }
        ProgressEvent::Complete { summary } => {
            println!("\n=== Summary ===");
            println!("Downloaded:       {}", summary.downloaded);
            println!("Thumbnails saved: {}", summary.thumbnails_saved);
            println!("Already complete: {}", summary.already_complete);
            println!("Failed:           {}", summary.failed);
        }
    }
}

/// Loads `.env` from the working directory; only a missing file is tolerated
fn load_dotenv() -> Result<(), dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

fn run(command: Command, input: ConfigInput) -> Result<(), ArchivistError> {
    match command {
        Command::Sync => {
            let config = input.validate()?;
            sync_channel(&config, handle_progress_event)?;
        }
        Command::Discover => {
            let config = input.validate()?;
            discover_channel(&config, handle_progress_event)?;
        }
        Command::Download => {
            let library = input.validate_library()?;
            download_catalog(&library, handle_progress_event)?;
        }
    }
    Ok(())
}

fn main() {
    // Must happen before clap reads the environment
    if let Err(e) = load_dotenv() {
        eprintln!("Error: failed to load .env: {}", e);
        process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Sync);

    if let Err(e) = run(command, cli.settings.into()) {
        eprintln!("\nError: {}", e);
        process::exit(1);
    }
}
