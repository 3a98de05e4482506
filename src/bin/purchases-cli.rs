use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "purchases-cli")]
#[command(about = "Admin CLI for the purchases listener", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000", env = "PURCHASES_ADMIN_URL")]
    url: String,

    #[arg(short, long, env = "ADMIN_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Service version and record count
    Status,
    /// List stored packages, newest first
    List {
        /// Only packages whose content contains this text
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
        #[arg(short, long, default_value_t = 0)]
        offset: i64,
    },
    /// Show one package including its content
    Show { id: i32 },
    /// Delete a package so the same content can be accepted again
    Delete { id: i32 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let base = cli.url.trim_end_matches('/');
    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{base}/admin/status"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::List {
            query,
            limit,
            offset,
        } => {
            let mut params = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
            if let Some(q) = query {
                params.push(("q", q));
            }
            client
                .get(format!("{base}/admin/purchases"))
                .query(&params)
                .headers(headers)
                .send()
                .await?
        }
        Commands::Show { id } => {
            client
                .get(format!("{base}/admin/purchases/{id}"))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Delete { id } => {
            client
                .delete(format!("{base}/admin/purchases/{id}"))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if status == reqwest::StatusCode::NO_CONTENT {
        println!("OK");
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
