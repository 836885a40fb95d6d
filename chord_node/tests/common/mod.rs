use chord_node::Node;
use chord_proto::chord::chord_server::ChordServer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tonic::transport::Server;

/// Binds a node to `addr` and serves it in a background task. Returns the
/// `Node` and a handle to the server task so tests can `abort()` it to
/// simulate a crash. Does not call `do_create`/`do_join` — callers decide
/// how the node enters the ring.
pub async fn start_node(addr: String, m: u32) -> (Arc<Node>, tokio::task::JoinHandle<()>) {
    let socket_addr: SocketAddr = addr.parse().unwrap();
    let listener = TcpListener::bind(socket_addr).await.unwrap();
    let local_addr_str = listener.local_addr().unwrap().to_string();

    let id = chord_proto::hash_id(&local_addr_str, m);

    let node = Node::new(id, local_addr_str.clone(), m);
    let node = Arc::new(node);
    let node_clone = node.clone();

    let handle = tokio::spawn(async move {
        Server::builder()
            .add_service(ChordServer::new((*node_clone).clone()))
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    (node, handle)
}

pub async fn stabilize_ring(nodes: &[Arc<Node>], rounds: usize) {
    println!("Stabilizing ring for {} rounds...", rounds);
    for _ in 0..rounds {
        for node in nodes {
            node.stabilize().await;
            node.fix_fingers().await;
            node.check_predecessor().await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
