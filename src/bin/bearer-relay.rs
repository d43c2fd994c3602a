use anyhow::{anyhow, Context, Result};
use bearer_relay::helpers::time::describe_expiration;
use bearer_relay::observability::metrics;
use bearer_relay::transport::RequestDescriptor;
use bearer_relay::utils::config_loader;
use bearer_relay::utils::logging;
use bearer_relay::utils::logging::LogLevel;
use bearer_relay::Relay;
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::Value;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "BEARER_RELAY_CONFIG", default_value = "bearer-relay.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// print collected metrics after the command
    #[arg(long)]
    metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and persist the returned token pair
    Login {
        /// JSON credentials posted to the login endpoint
        #[arg(long)]
        body: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the stored session
    Status,
    /// Send one authenticated request
    Request {
        method: String,
        path: String,
        #[arg(long)]
        body: Option<String>,
        /// extra header, `Name: value`; repeatable
        #[arg(long = "header", value_name = "K:V")]
        headers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config and logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level).await?;

    // -------------------------------
    // 2. Wire store, bus, coordinator and transports
    // -------------------------------

    let relay = Relay::from_config(&service_config).await?;
    let _events = relay.events.subscribe(|event| info!(event = event.name(), "auth event"));

    // -------------------------------
    // 3. Run the command
    // -------------------------------

    match args.command {
        Command::Login { body } => {
            let credentials: Value = serde_json::from_str(&body).context("--body is not valid JSON")?;
            let session = relay.session.login(credentials).await?;
            println!("{}", serde_json::to_string_pretty(&session.user)?);
        }
        Command::Logout => {
            relay.session.logout();
            println!("logged out");
        }
        Command::Status => match relay.session.current() {
            None => println!("no session"),
            Some(pair) => {
                let expiry = pair
                    .access_expires_at()
                    .map(describe_expiration)
                    .unwrap_or_else(|| "expiry unknown".to_owned());
                println!("session present, access token {}", expiry);
                println!("refresh token: {}", if pair.refresh_token.is_some() { "present" } else { "absent" });
            }
        },
        Command::Request { method, path, body, headers } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .map_err(|_| anyhow!("unknown method '{}'", method))?;
            let mut request = RequestDescriptor::new(method, path);
            for header in headers {
                let (key, value) = header
                    .split_once(':')
                    .ok_or_else(|| anyhow!("header '{}' is not in 'Name: value' form", header))?;
                request = request.header(key.trim(), value.trim());
            }
            if let Some(body) = body {
                request = match serde_json::from_str::<Value>(&body) {
                    Ok(json) => request.json(json),
                    Err(_) => request.text(body),
                };
            }

            let response = relay.transport.send(request).await?;
            eprintln!("{}", response.status);
            println!("{}", response.text());
        }
    }

    // -------------------------------
    // 4. Metrics
    // -------------------------------

    if args.metrics || service_config.settings.metrics.is_enabled {
        print!("{}", metrics::encode().await?);
    }

    Ok(())
}
