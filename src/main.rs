use clap::Parser; // for cli
use serde_json::Value;
use std::process::ExitCode;
use stream_stats_client::config::{Args, Command};
use stream_stats_client::{ListQuery, RequestOptions, Result, StatsClient, Topic, metrics};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn run_command(client: &StatsClient, command: &Command) -> Result<Value> {
    match command {
        Command::Get { endpoint, params } => {
            let mut options = RequestOptions::get();
            for pair in params {
                // "key=value", a bare key is sent empty
                let (key, value) = pair.split_once('=').unwrap_or((pair.as_str(), ""));
                options = options.param(key, value);
            }
            client.request(endpoint, options).await
        }
        Command::Rooms { id: Some(id) } => client.rooms().get(id).await,
        Command::Rooms { id: None } => client.rooms().list(&ListQuery::new()).await,
        Command::User { id } => client.users().get(id).await,
        Command::ActiveUsers => client
            .users()
            .get_stats()
            .await
            .map(|stats| serde_json::json!(stats)),
        Command::Games { provider: Some(p) } => {
            client.igames().get_by_provider(p, &ListQuery::new()).await
        }
        Command::Games { provider: None } => client.igames().list(&ListQuery::new()).await,
        Command::Missions { room: Some(room) } => {
            client.missions().get_by_room(room, &ListQuery::new()).await
        }
        Command::Missions { room: None } => client.missions().list(&ListQuery::new()).await,
        Command::Leaderboard { mission_id, limit } => {
            client.missions().get_leaderboard(mission_id, Some(*limit)).await
        }
        Command::Bets { feed } => {
            let query = ListQuery::new();
            match feed.as_str() {
                "big" => client.bets().get_big(&query).await,
                "lucky" => client.bets().get_lucky(&query).await,
                "wins" => client.bets().get_wins(&query).await,
                _ => client.bets().get_recent(&query).await,
            }
        }
        Command::Banners => client.content().get_banners().await,
        Command::Livestreams => client.content().get_livestreams().await,
        Command::Health => client.system().health().await,
        Command::Features => client.system().get_features().await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // parse cli arguments
    let args = Args::parse();
    let client = StatsClient::new(args.client_config());

    info!("Querying {}", args.base_url);
    info!(
        "Cache TTL: {}s, rate limit: {} requests per 5 minutes",
        args.cache_ttl, args.rate_limit
    );

    if args.events {
        for topic in [Topic::Request, Topic::RateLimit, Topic::Error] {
            // lives as long as the process
            let _ = client.on(topic, |event| {
                if let Ok(line) = serde_json::to_string(event) {
                    eprintln!("{}", line);
                }
            });
        }
    }

    let mut last = Ok(Value::Null);
    for _ in 0..args.repeat.max(1) {
        last = run_command(&client, &args.command).await;
        if last.is_err() {
            break;
        }
    }

    let code = match last {
        Ok(body) => {
            match serde_json::to_string_pretty(&body) {
                Ok(text) => println!("{}", text),
                Err(_) => println!("{}", body),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(code = %e.code(), "{}", e);
            ExitCode::FAILURE
        }
    };

    let status = client.get_rate_limit_status();
    info!(
        "Rate limit: {}/{} used ({:.1}%), {} remaining",
        status.used, status.limit, status.percentage, status.remaining
    );

    if args.metrics {
        print!("{}", metrics::render());
    }
    code
}
