use anyhow::Context;
use chord_proto::chord::chord_server::ChordServer;
use chord_proto::hash_id;
use clap::Parser;
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tonic::transport::Server;

use chord_node::constants::{
    CHECK_PREDECESSOR_INTERVAL_MS, DEFAULT_PORT, DEFAULT_RING_BITS, FIX_FINGERS_INTERVAL_MS,
    LOCALHOST, STABILIZATION_INTERVAL_MS,
};
use chord_node::Node;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host to bind and advertise
    #[arg(long, default_value = LOCALHOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Ring size exponent m; the keyspace is [0, 2^m)
    #[arg(short = 'm', long = "ring-bits", default_value_t = DEFAULT_RING_BITS)]
    ring_bits: u32,

    /// Address of an existing ring member to join through
    #[arg(short, long)]
    join: Option<String>,

    /// Overrides RUST_LOG when set
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(level) = &args.log_level {
        env_logger::Builder::new().parse_filters(level).init();
    } else {
        env_logger::init();
    }

    let addr_str = format!("{}:{}", args.host, args.port);
    let addr: SocketAddr = addr_str.parse().context("invalid host/port")?;
    let id = hash_id(&addr_str, args.ring_bits);

    info!("node starting at {} with id {} (m={})", addr_str, id, args.ring_bits);

    let node = Node::new(id, addr_str.clone(), args.ring_bits);
    let node = Arc::new(node);

    match args.join {
        Some(join_addr) => {
            node.do_join(join_addr.clone()).await.context("join failed")?;
            info!("joined ring via {}", join_addr);
        }
        None => {
            node.do_create().await.context("create failed")?;
        }
    }

    let maintenance_node = node.clone();
    let maintenance_handle = tokio::spawn(async move {
        loop {
            sleep(Duration::from_millis(STABILIZATION_INTERVAL_MS)).await;
            maintenance_node.stabilize().await;
            sleep(Duration::from_millis(FIX_FINGERS_INTERVAL_MS)).await;
            maintenance_node.fix_fingers().await;
            sleep(Duration::from_millis(CHECK_PREDECESSOR_INTERVAL_MS)).await;
            maintenance_node.check_predecessor().await;
        }
    });

    let shutdown = node.shutdown.clone();
    let shutdown_signal = async move { shutdown.notified().await };

    info!("server listening on {}", addr);
    Server::builder()
        .add_service(ChordServer::new((*node).clone()))
        .serve_with_shutdown(addr, shutdown_signal)
        .await
        .context("server error")?;

    maintenance_handle.abort();
    info!("server stopped");
    Ok(())
}
