use chord_node::Node;
use chord_proto::chord::chord_server::{Chord, ChordServer};
use chord_proto::chord::{GetRequest, PutRequest};
use chord_proto::hash_id;
use std::net::SocketAddr;

use std::time::Duration;
use tokio::net::TcpListener;
use tonic::transport::Server;
use tonic::Request;

const M: u32 = 24;

async fn start_node(id: u64, addr: String) -> Node {
    let node = Node::new(id, addr.clone(), M);
    let node_clone = node.clone();
    let addr_clone = addr.clone();

    tokio::spawn(async move {
        let addr: SocketAddr = addr_clone.parse().unwrap();
        let listener = TcpListener::bind(addr).await.unwrap();
        println!("Node {} listening on {}", id, addr_clone);

        Server::builder()
            .add_service(ChordServer::new(node_clone))
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    node
}

#[tokio::test]
async fn test_chord_ring_formation_and_routing() {
    let addr1 = "127.0.0.1:50001".to_string();
    let addr2 = "127.0.0.1:50002".to_string();
    let addr3 = "127.0.0.1:50003".to_string();

    let id1 = hash_id(&addr1, M);
    let id2 = hash_id(&addr2, M);
    let id3 = hash_id(&addr3, M);

    println!("Node 1: {} ({})", id1, addr1);
    println!("Node 2: {} ({})", id2, addr2);
    println!("Node 3: {} ({})", id3, addr3);

    let node1 = start_node(id1, addr1.clone()).await;
    node1.do_create().await.expect("Node 1 failed to create ring");

    let node2 = start_node(id2, addr2.clone()).await;
    node2
        .do_join(addr1.clone())
        .await
        .expect("Node 2 failed to join Node 1");

    let node3 = start_node(id3, addr3.clone()).await;
    node3
        .do_join(addr1.clone())
        .await
        .expect("Node 3 failed to join Node 1");

    let nodes = vec![node1.clone(), node2.clone(), node3.clone()];

    println!("Stabilizing...");
    for _ in 0..10 {
        for node in &nodes {
            node.stabilize().await;
            node.fix_fingers().await;
            node.check_predecessor().await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    for node in &nodes {
        let state = node.state.read().await;
        println!("Node {} successor is {}", node.id, state.successor.id);
    }

    let key = "test_key";
    let value = "test_value";
    let key_id = hash_id(key, M);
    println!("Key '{}' has ID {}", key, key_id);

    println!("Putting key on Node 1...");
    let put_req = Request::new(PutRequest {
        key: key.to_string(),
        value: value.to_string(),
    });
    node1.put(put_req).await.expect("Put failed");

    println!("Getting key from Node 3...");
    let get_req = Request::new(GetRequest {
        key: key.to_string(),
    });
    let response = node3.get(get_req).await.expect("Get failed");
    let resp = response.into_inner();

    assert!(resp.found, "Key not found");
    assert_eq!(resp.value, value, "Value mismatch");
    println!("Test passed!");
}
