use std::io::Write;

use amazon_music_api::{AmazonMusic, CredentialSource, Credentials, SearchOptions};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "amzn-music",
    version,
    about = "Amazon Music web API client"
)]
struct Cli {
    /// Sign in with this email (password prompted on stdin). Without
    /// it, only cached cookies are used.
    #[arg(short, long, global = true)]
    email: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Establish a session and store cookies for later runs
    Login,
    /// Delete stored cookies
    Logout,
    /// Search the catalogue and library
    Search {
        /// Search terms
        query: String,
        /// Library results only
        #[arg(short, long)]
        library: bool,
    },
    /// Show an album and its tracks
    Album {
        /// Album ASIN, e.g. B00J9AEZ7G
        asin: String,
    },
    /// Show a playlist and its tracks
    Playlist {
        /// Playlist ASIN, e.g. B075QGZDZ3
        asin: String,
    },
    /// Create a station and list its first tracks
    Station {
        /// Station key, e.g. A2UW0MECRAWILL
        id: String,
        /// How many tracks to pull from the queue
        #[arg(short, long, default_value = "20")]
        count: usize,
    },
    /// Resolve the stream URL for a track
    StreamUrl {
        /// Track ASIN
        asin: String,
    },
    /// List library contents
    Library {
        #[arg(value_enum)]
        kind: LibraryKind,
    },
    /// Show browse recommendations
    Recommended,
}

#[derive(Clone, Copy, ValueEnum)]
enum LibraryKind {
    Albums,
    Artists,
    Genres,
    Songs,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if matches!(cli.command, Command::Logout) {
        return cmd_logout();
    }

    let client = connect(cli.email)?;
    match cli.command {
        Command::Login => {
            println!(
                "Signed in (region {}, territory {}).",
                client.session().region,
                client.session().territory
            );
            Ok(())
        }
        Command::Logout => unreachable!("handled above"),
        Command::Search { query, library } => cmd_search(&client, &query, library),
        Command::Album { asin } => cmd_album(&client, &asin),
        Command::Playlist { asin } => cmd_playlist(&client, &asin),
        Command::Station { id, count } => cmd_station(&client, &id, count),
        Command::StreamUrl { asin } => cmd_stream_url(&client, &asin),
        Command::Library { kind } => cmd_library(&client, kind),
        Command::Recommended => cmd_recommended(&client),
    }
}

/// Connect using cached cookies, prompting for a password only if an
/// email was given and the cached session is no longer valid.
fn connect(email: Option<String>) -> Result<AmazonMusic> {
    let source = match email {
        Some(email) => CredentialSource::deferred(move || {
            let password = prompt_password().unwrap_or_default();
            Credentials::new(email.clone(), password)
        }),
        None => CredentialSource::deferred(|| {
            let email = prompt("Email: ").unwrap_or_default();
            let password = prompt_password().unwrap_or_default();
            Credentials::new(email, password)
        }),
    };
    AmazonMusic::connect(&source).context("failed to establish session")
}

fn prompt(label: &str) -> std::io::Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

fn prompt_password() -> std::io::Result<String> {
    // No TTY echo suppression here; use `login` from a trusted terminal.
    prompt("Password: ")
}

fn cmd_logout() -> Result<()> {
    let path = amazon_music_api::cookies::CookieJar::default_path()?;
    if path.exists() {
        std::fs::remove_file(&path)?;
        println!("Removed {}.", path.display());
    } else {
        println!("No stored cookies.");
    }
    Ok(())
}

fn cmd_search(client: &AmazonMusic, query: &str, library: bool) -> Result<()> {
    let opts = SearchOptions {
        library_only: library,
        ..SearchOptions::default()
    };
    let results = client.search(Some(query), &opts)?;
    for (label, doc) in results {
        let hits = doc["hits"].as_array().map_or(0, Vec::len);
        println!("{label} ({hits} hits)");
        for hit in doc["hits"].as_array().into_iter().flatten().take(10) {
            let d = &hit["document"];
            let title = d["title"].as_str().or_else(|| d["name"].as_str());
            let asin = d["asin"].as_str().unwrap_or("-");
            println!("  [{asin}] {}", title.unwrap_or("?"));
        }
    }
    Ok(())
}

fn cmd_album(client: &AmazonMusic, asin: &str) -> Result<()> {
    let album = client.get_album(asin)?;
    println!("Album:  {} (id={})", album.title, album.id);
    if let Some(artist) = &album.artist {
        println!("Artist: {artist}");
    }
    println!("Tracks: {}", album.track_count);
    for t in album.tracks.iter().flatten() {
        println!("  [{}] {} - {}", t.id, t.artist, t.title);
    }
    Ok(())
}

fn cmd_playlist(client: &AmazonMusic, asin: &str) -> Result<()> {
    let playlist = client.get_playlist(asin)?;
    println!("Playlist: {} (id={})", playlist.title, playlist.id);
    println!("Tracks:   {}", playlist.track_count);
    for t in playlist.tracks.iter().flatten() {
        println!("  [{}] {} - {}", t.id, t.artist, t.title);
    }
    Ok(())
}

fn cmd_station(client: &AmazonMusic, id: &str, count: usize) -> Result<()> {
    let station = client.create_station(id)?;
    println!("Station: {} (id={})", station.title, station.id);
    for track in client.station_tracks(&station).take(count) {
        let t = track?;
        println!("  {} - {}", t.artist, t.title);
    }
    Ok(())
}

fn cmd_stream_url(client: &AmazonMusic, asin: &str) -> Result<()> {
    let track = client.get_track(asin)?;
    let url = client.stream_url(&track)?;
    println!("{url}");
    Ok(())
}

fn cmd_library(client: &AmazonMusic, kind: LibraryKind) -> Result<()> {
    match kind {
        LibraryKind::Albums => {
            for a in client.my_albums()? {
                println!("[{}] {} - {}", a.id, a.artist.as_deref().unwrap_or("?"), a.title);
            }
        }
        LibraryKind::Artists => {
            for a in client.my_artists()? {
                println!("[{}] {}", a.id, a.name);
            }
        }
        LibraryKind::Genres => {
            for g in client.my_genres()? {
                println!("{}", g.name);
            }
        }
        LibraryKind::Songs => {
            for t in client.my_songs()? {
                println!("[{}] {} - {}", t.id, t.artist, t.title);
            }
        }
    }
    Ok(())
}

fn cmd_recommended(client: &AmazonMusic) -> Result<()> {
    use amazon_music_api::Recommendation;
    for group in client.recommendations()? {
        match group {
            Recommendation::Playlists(items) => {
                println!("Playlists:");
                for p in items {
                    println!("  [{}] {}", p.id, p.title);
                }
            }
            Recommendation::Albums(items) => {
                println!("Albums:");
                for a in items {
                    println!("  [{}] {}", a.id, a.title);
                }
            }
            Recommendation::Tracks(items) => {
                println!("Tracks:");
                for t in items {
                    println!("  [{}] {} - {}", t.id, t.artist, t.title);
                }
            }
            Recommendation::Stations(items) => {
                println!("Stations:");
                for s in items {
                    println!("  [{}] {}", s.id, s.title);
                }
            }
        }
    }
    Ok(())
}
