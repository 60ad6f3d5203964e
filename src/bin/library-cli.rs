use clap::{Parser, Subcommand};
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "library-cli")]
#[command(about = "Command-line client for the library service", long_about = None)]
struct Cli {
    #[arg(short, long, env = "LIBRARY_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Token from `login`, sent as a bearer token.
    #[arg(short, long, env = "LIBRARY_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lifecycle state and pending deletions
    Health,
    /// List books (only your own with --mine)
    Books {
        #[arg(long)]
        mine: bool,
    },
    /// List users
    Users,
    /// Log in and print the issued token
    Login { email: String, pass: String },
    /// Soft-delete a book
    DeleteBook { id: String },
    /// Soft-delete a user
    DeleteUser { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{base}/health")).send().await?;
            print_response(res).await?;
        }
        Commands::Books { mine } => {
            let res = if mine {
                let token = cli.token.ok_or("--token is required with --mine")?;
                client
                    .get(format!("{base}/book/my-books"))
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .send()
                    .await?
            } else {
                client.get(format!("{base}/book/all_books")).send().await?
            };
            print_response(res).await?;
        }
        Commands::Users => {
            let res = client.get(format!("{base}/user/get_all_users")).send().await?;
            print_response(res).await?;
        }
        Commands::Login { email, pass } => {
            let res = client
                .post(format!("{base}/user/auth"))
                .json(&json!({ "email": email, "pass": pass }))
                .send()
                .await?;
            match res.headers().get(AUTHORIZATION).map(|v| v.to_str()) {
                Some(Ok(token)) if res.status().is_success() => println!("{token}"),
                _ => print_response(res).await?,
            }
        }
        Commands::DeleteBook { id } => {
            let res = client.delete(format!("{base}/book/delete/{id}")).send().await?;
            print_response(res).await?;
        }
        Commands::DeleteUser { id } => {
            let res = client.delete(format!("{base}/user/delete/{id}")).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if status == reqwest::StatusCode::NO_CONTENT {
        println!("(nothing stored)");
        return Ok(());
    }
    if !status.is_success() {
        eprintln!("Error: service returned status {status}");
        if let Ok(text) = res.text().await {
            eprintln!("Response: {text}");
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
