use anyhow::Context;
use chord_proto::chord::chord_client::ChordClient;
use chord_proto::chord::{Empty, FindSuccessorRequest, GetRequest, JoinRequest, PutRequest};
use clap::{Parser, Subcommand};
use tonic::Request;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host of the node to connect to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port of the node to connect to
    #[arg(short, long)]
    port: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new ring at the target node
    Create,
    /// Join the target node to an existing ring member
    Join {
        /// Host of an existing ring member
        host: String,
        /// Port of an existing ring member
        port: u16,
    },
    /// Ask the target node to find the successor of an id
    FindSuccessor { id: u64 },
    /// Store a key/value pair in the ring
    Put { key: String, value: String },
    /// Fetch a value from the ring
    Get { key: String },
    /// Ask the target node to shut down
    Shutdown,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let target = format!("http://{}:{}", cli.host, cli.port);
    let mut client = ChordClient::connect(target.clone())
        .await
        .with_context(|| format!("could not connect to {}", target))?;

    match cli.command {
        Commands::Create => {
            client.create(Request::new(Empty {})).await?;
            println!("ring created");
        }
        Commands::Join { host, port } => {
            let known_address = format!("{}:{}", host, port);
            client
                .join(Request::new(JoinRequest { known_address: known_address.clone() }))
                .await?;
            println!("joined via {}", known_address);
        }
        Commands::FindSuccessor { id } => {
            let resp = client
                .find_successor(Request::new(FindSuccessorRequest { id }))
                .await?
                .into_inner();
            let node = resp.node.context("empty find_successor response")?;
            println!("successor of {}: id={} address={} ({} hop(s))", id, node.id, node.address, resp.hops);
        }
        Commands::Put { key, value } => {
            let resp = client
                .put(Request::new(PutRequest { key: key.clone(), value }))
                .await?
                .into_inner();
            let node = resp.storage_node.context("empty put response")?;
            println!("put '{}' on node id={} address={} ({} hop(s))", key, node.id, node.address, resp.hops);
        }
        Commands::Get { key } => {
            let resp = client
                .get(Request::new(GetRequest { key: key.clone() }))
                .await?
                .into_inner();
            if resp.found {
                println!("{} = {}", key, resp.value);
            } else {
                println!("{}: not found", key);
            }
        }
        Commands::Shutdown => {
            client.shutdown(Request::new(Empty {})).await?;
            println!("shutdown requested");
        }
    }

    Ok(())
}
