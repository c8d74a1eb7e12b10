use std::process::ExitCode;

use clap::{Parser, Subcommand};
use healthz::grpc::{check_health, check_ready};

#[derive(Parser)]
#[command(name = "healthz-cli")]
#[command(about = "Query a healthz sidecar", long_about = None)]
struct Cli {
    /// Base URL of the HTTP adapter
    #[arg(short, long, default_value = "http://localhost:9244", env = "HEALTHZ_URL")]
    url: String,

    /// Address of the gRPC adapter
    #[arg(short, long, default_value = "localhost:9245", env = "HEALTHZ_GRPC")]
    grpc: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query /healthz
    Health,
    /// Query /readyz
    Ready,
    /// Query /status
    Status,
    /// Check grpc.health.v1.GRPCHealth
    GrpcHealth,
    /// Check grpc.health.v1.GRPCReady
    GrpcReady,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Health => http_check(&cli.url, "/healthz").await,
        Commands::Ready => http_check(&cli.url, "/readyz").await,
        Commands::Status => http_check(&cli.url, "/status").await,
        Commands::GrpcHealth => check_health(&cli.grpc, &cli.grpc).await.map_err(|e| e.to_string()),
        Commands::GrpcReady => check_ready(&cli.grpc, &cli.grpc).await.map_err(|e| e.to_string()),
    };

    match result {
        Ok(()) => {
            println!("OK");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn http_check(base: &str, path: &str) -> Result<(), String> {
    let res = reqwest::get(format!("{}{}", base.trim_end_matches('/'), path))
        .await
        .map_err(|e| e.to_string())?;
    let status = res.status();
    let body = res.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(format!("{} returned status {}: {}", path, status, body));
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or(body));
    } else if !body.is_empty() {
        println!("{}", body);
    }
    Ok(())
}
