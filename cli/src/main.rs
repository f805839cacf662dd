use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Parser)]
#[command(name = "top10")]
#[command(about = "Top 10 Albums CLI - Browse published lists via HTTP", long_about = None)]
struct Cli {
    /// Base URL of the Top 10 Albums server
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Print the raw JSON instead of a summary
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every user and how many albums they published
    Users,
    /// Show one user's ranked list
    Show {
        /// Username as it appears in /user/<username>
        username: String,
    },
}

#[derive(Deserialize, Debug)]
struct UserDirectory {
    users: Vec<PublicProfile>,
}

#[derive(Deserialize, Debug)]
struct PublicProfile {
    username: String,
    display_name: String,
    albums: Vec<PublishedAlbum>,
}

#[derive(Deserialize, Debug)]
struct PublishedAlbum {
    rank: i64,
    title: String,
    artist: String,
    #[serde(default)]
    why: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let base = cli.api_url.trim_end_matches('/');

    match cli.command {
        Commands::Users => list_users(base, cli.json).await?,
        Commands::Show { username } => show_user(base, &username, cli.json).await?,
    }

    Ok(())
}

async fn fetch(url: &str) -> Result<Option<serde_json::Value>> {
    let client = reqwest::Client::new();
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .context("Failed to send request to Top 10 API")?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !response.status().is_success() {
        return Err(anyhow::anyhow!(
            "Request failed with status: {}",
            response.status()
        ));
    }

    let body = response
        .json()
        .await
        .context("Failed to parse API response")?;
    Ok(Some(body))
}

async fn list_users(base: &str, raw: bool) -> Result<()> {
    let body = fetch(&format!("{base}/api/users"))
        .await?
        .context("Users endpoint not found")?;

    if raw {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let directory: UserDirectory =
        serde_json::from_value(body).context("Unexpected users response")?;

    if directory.users.is_empty() {
        println!("No users found");
        return Ok(());
    }

    let with_lists = directory
        .users
        .iter()
        .filter(|user| !user.albums.is_empty())
        .count();
    println!(
        "{} users with lists, {} total users",
        with_lists,
        directory.users.len()
    );
    for user in &directory.users {
        let albums = match user.albums.len() {
            0 => "no albums".to_string(),
            1 => "1 album".to_string(),
            n => format!("{n} albums"),
        };
        println!("  {:<24} {:<24} {}", user.username, user.display_name, albums);
    }

    Ok(())
}

async fn show_user(base: &str, username: &str, raw: bool) -> Result<()> {
    let url = format!(
        "{base}/api/users/{}",
        urlencoding::encode(&username.to_lowercase())
    );
    let Some(body) = fetch(&url).await? else {
        return Err(anyhow::anyhow!("User not found: {username}"));
    };

    if raw {
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let profile: PublicProfile =
        serde_json::from_value(body).context("Unexpected profile response")?;

    println!("{}'s Top 10", profile.display_name);
    if profile.albums.is_empty() {
        println!("  No albums published yet.");
        return Ok(());
    }
    for album in &profile.albums {
        println!("  #{:<3} {} - {}", album.rank, album.title, album.artist);
        if !album.why.is_empty() {
            println!("        {}", album.why);
        }
    }

    Ok(())
}
