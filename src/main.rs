use anyhow::anyhow;
use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use counter_app::client::CounterClient;
use counter_app::client::DEFAULT_SERVER_URL;
use counter_app::config::Config;
use counter_app::config::StorageConfig;
use counter_app::http;
use counter_app::model::Counter;
use counter_app::model::Increment;
use counter_app::service::CounterService;
use counter_app::store;
use counter_app::view::CounterView;
use dropshot::ConfigLogging;
use dropshot::ConfigLoggingLevel;
use slog::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;

#[derive(Debug, Parser)]
#[command(
    name = "counter",
    about = "A counter backed by a single database row"
)]
struct CounterArgs {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Run the counter server
    Serve(ServeArgs),
    /// Print the current counter
    Show(ClientArgs),
    /// Increment the counter and print the result
    Increment {
        #[command(flatten)]
        client: ClientArgs,
        /// Amount to add (must be positive)
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        by: i32,
    },
    /// Show the counter interactively: enter increments, "q" quits
    Watch(ClientArgs),
    /// Print the OpenAPI document for the server's API
    Openapi,
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Address to listen on (overrides the configuration file)
    #[arg(long)]
    bind_address: Option<SocketAddr>,
    /// PostgreSQL URL (overrides the configuration file)
    #[arg(long, env = "COUNTER_DATABASE_URL", conflicts_with = "in_memory")]
    database_url: Option<String>,
    /// Keep the counter in memory instead of in PostgreSQL
    #[arg(long)]
    in_memory: bool,
}

#[derive(Debug, Args)]
struct ClientArgs {
    /// Base URL of the counter server
    #[arg(
        long,
        env = "COUNTER_SERVER_URL",
        default_value = DEFAULT_SERVER_URL
    )]
    server: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CounterArgs::parse();
    match args.cmd {
        Cmd::Serve(serve_args) => cmd_serve(serve_args).await,
        Cmd::Show(client_args) => {
            let client = make_client(&client_args)?;
            print_counter(&client.get_counter().await?);
            Ok(())
        }
        Cmd::Increment { client: client_args, by } => {
            let increment = Increment::new(by)?;
            let client = make_client(&client_args)?;
            print_counter(&client.increment_counter(increment).await?);
            Ok(())
        }
        Cmd::Watch(client_args) => cmd_watch(&client_args).await,
        Cmd::Openapi => http::write_openapi(&mut std::io::stdout()),
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(bind_address) = args.bind_address {
        config.dropshot.bind_address = bind_address;
    }
    if args.in_memory {
        config.storage = StorageConfig::Memory;
    } else if let Some(url) = args.database_url {
        config.storage = match config.storage {
            StorageConfig::Postgres { max_connections, .. } => {
                StorageConfig::Postgres { url, max_connections }
            }
            StorageConfig::Memory => {
                StorageConfig::Postgres { url, max_connections: 1 }
            }
        };
    }

    let log = config.log.to_logger("counter").context("creating logger")?;
    let service = store::create_store(&log, &config.storage)
        .await
        .context("setting up counter store")?;
    info!(&log, "setting up dropshot server");
    let server =
        http::create_dropshot_server(config.dropshot, log.clone(), service)
            .await?;
    info!(&log, "set up dropshot server";
        "local_address" => ?server.local_addr());
    server.await.map_err(|error| anyhow!("waiting for server: {:#}", error))
}

async fn cmd_watch(args: &ClientArgs) -> anyhow::Result<()> {
    let client = make_client(args)?;
    let log = client_logger()?;
    let mut view = CounterView::new(log, client);
    if view.begin_load() {
        println!("{}\n", view.render());
        let result = view.service().get_counter().await;
        view.finish_load(result);
    }
    println!("{}\n", view.render());

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) =
        lines.next_line().await.context("reading standard input")?
    {
        match line.trim() {
            "q" | "quit" => break,
            "" | "+" => {
                if !view.begin_increment() {
                    continue;
                }
                println!("{}\n", view.render());
                let result =
                    view.service().increment_counter(Increment::ONE).await;
                view.finish_increment(result);
            }
            _ => {
                println!("press enter to increment, \"q\" to quit");
                continue;
            }
        }
        println!("{}\n", view.render());
    }
    Ok(())
}

fn client_logger() -> anyhow::Result<slog::Logger> {
    ConfigLogging::StderrTerminal { level: ConfigLoggingLevel::Warn }
        .to_logger("counter")
        .context("creating logger")
}

fn make_client(args: &ClientArgs) -> anyhow::Result<CounterClient> {
    Ok(CounterClient::new(client_logger()?, &args.server))
}

fn print_counter(counter: &Counter) {
    println!(
        "counter {}: {} (updated {})",
        counter.id,
        counter.count,
        counter.updated_at.to_rfc3339()
    );
}
