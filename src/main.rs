use std::error::Error;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use cogent_lg::{AsnTable, Config, IpVersion, Session, TracingSink};

#[derive(Parser)]
#[command(name = "cogent-lg", version, about = "Query the Cogent looking glass")]
struct Cli {
    /// Looking glass endpoint
    #[arg(long, env = "COGENT_LG_URL", default_value = cogent_lg::config::PORTAL_URL)]
    url: String,
    /// Node to query from (see `nodes`)
    #[arg(long, short)]
    node: Option<String>,
    /// IP version to query with (ipv4 or ipv6)
    #[arg(long, short = 'i', default_value_t = IpVersion::V4)]
    ip_version: IpVersion,
    /// Request timeout in seconds (0 waits for as long as the portal streams)
    #[arg(long, default_value_t = 0)]
    timeout: u64,
    /// Log level when RUST_LOG is not set
    #[arg(long, env = "COGENT_LG_LOG", default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the available nodes
    Nodes {
        /// List BGP capable nodes instead
        #[arg(long)]
        bgp: bool,
        /// Print the full catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ping a host from the selected node
    Ping { host: String },
    /// Traceroute to a host from the selected node
    Trace { host: String },
    /// Show the BGP route towards a host
    Bgp { host: String },
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        error!(error = %e, "query failed");
        eprintln!("[!] {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = Config::with_portal_url(cli.url);
    if cli.timeout > 0 {
        config.timeout = Some(Duration::from_secs(cli.timeout));
    }

    let mut asn = AsnTable::new();
    asn.insert(174, "COGENT");
    let mut session = Session::with_collaborators(config, Arc::new(asn), Arc::new(TracingSink))?;

    let host = match &cli.command {
        Command::Nodes { bgp, json } => {
            session.nodes();
            if *json {
                let catalog = session.catalog();
                let doc = serde_json::json!({ "nodes": &catalog.diagnostic, "bgp": &catalog.bgp });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                let names = if *bgp { session.bgp_nodes() } else { session.nodes() };
                for name in names {
                    println!("{}", name);
                }
            }
            return Ok(());
        }
        Command::Ping { host } | Command::Trace { host } | Command::Bgp { host } => host.clone(),
    };

    session.set(&host, cli.ip_version);
    if let Some(node) = &cli.node {
        let selected = match cli.command {
            Command::Bgp { .. } => session.change_bgp_node(node),
            _ => {
                session.nodes();
                session.change_node(node)
            }
        };
        if !selected {
            return Err(format!("unknown node: {}", node).into());
        }
    }

    match cli.command {
        Command::Ping { .. } => println!("{}", session.ping()?),
        Command::Trace { .. } => {
            for line in session.trace() {
                println!("{}", line?);
            }
        }
        Command::Bgp { .. } => {
            for line in session.bgp() {
                println!("{}", line?);
            }
        }
        Command::Nodes { .. } => {}
    }
    Ok(())
}
