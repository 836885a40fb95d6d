mod common;
use common::{stabilize_ring, start_node};

const M: u32 = 24;

#[tokio::test]
async fn test_join_after_node_departure() {
    let addr1 = "127.0.0.1:51001".to_string();
    let addr2 = "127.0.0.1:51002".to_string();
    let addr3 = "127.0.0.1:51003".to_string();

    let (node1, _h1) = start_node(addr1.clone(), M).await;
    node1.do_create().await.expect("Node 1 failed to create ring");
    println!("Node 1: {} ({})", node1.id, addr1);

    let (node2, h2) = start_node(addr2.clone(), M).await;
    node2
        .do_join(addr1.clone())
        .await
        .expect("Node 2 failed to join Node 1");
    println!("Node 2: {} ({})", node2.id, addr2);

    let (node3, _h3) = start_node(addr3.clone(), M).await;
    node3
        .do_join(addr1.clone())
        .await
        .expect("Node 3 failed to join Node 1");
    println!("Node 3: {} ({})", node3.id, addr3);

    let nodes = vec![node1.clone(), node2.clone(), node3.clone()];

    println!("Stabilizing...");
    stabilize_ring(&nodes, 5).await;

    println!("Killing Node 2...");
    h2.abort();
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    println!("Stabilizing after node death...");
    stabilize_ring(&[node1.clone(), node3.clone()], 5).await;

    let addr4 = "127.0.0.1:51004".to_string();
    let (node4, _h4) = start_node(addr4.clone(), M).await;
    println!("Node 4: {} ({})", node4.id, addr4);

    println!("Node 4 joining via Node 1...");
    match node4.do_join(addr1.clone()).await {
        Ok(_) => println!("Node 4 joined successfully"),
        Err(e) => {
            panic!("Node 4 failed to join: {}", e);
        }
    }
}
