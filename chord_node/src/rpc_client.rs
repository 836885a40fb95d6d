//! Thin outbound RPC helpers. Every function dials the peer fresh (no
//! connection pooling, per §4.5 "not required to be") and maps transport
//! failures into [`NodeError::TransientRpc`]. This is the only module in the
//! crate that names `tonic::transport` types outside of `main.rs` — the node
//! logic calls these functions and never touches a `Channel` directly.

use crate::constants::RPC_TIMEOUT_MS;
use crate::error::NodeError;
use chord_proto::chord::chord_client::ChordClient;
use chord_proto::chord::{
    Empty, FindSuccessorRequest, GetLocalRequest, GetRequest, JoinRequest, NodeInfo,
    PutLocalRequest, PutRequest,
};
use std::time::Duration;
use tonic::transport::Channel;
use tonic::{Code, Request};

async fn connect(address: &str) -> Result<ChordClient<Channel>, NodeError> {
    let endpoint = format!("http://{}", address);
    let channel = tonic::transport::Endpoint::from_shared(endpoint)
        .map_err(|e| NodeError::TransientRpc(e.to_string()))?
        .timeout(Duration::from_millis(RPC_TIMEOUT_MS))
        .connect()
        .await
        .map_err(|e| NodeError::TransientRpc(e.to_string()))?;
    Ok(ChordClient::new(channel))
}

pub async fn find_successor(address: &str, id: u64) -> Result<(NodeInfo, u32), NodeError> {
    let mut client = connect(address).await?;
    let resp = client
        .find_successor(Request::new(FindSuccessorRequest { id }))
        .await?
        .into_inner();
    let node = resp
        .node
        .ok_or_else(|| NodeError::TransientRpc("empty find_successor response".into()))?;
    Ok((node, resp.hops))
}

pub async fn get_predecessor(address: &str) -> Result<Option<NodeInfo>, NodeError> {
    let mut client = connect(address).await?;
    match client.get_predecessor(Request::new(Empty {})).await {
        Ok(resp) => Ok(Some(resp.into_inner())),
        Err(status) if status.code() == Code::NotFound => Ok(None),
        Err(status) => Err(status.into()),
    }
}

pub async fn get_successor(address: &str) -> Result<NodeInfo, NodeError> {
    let mut client = connect(address).await?;
    Ok(client.get_successor(Request::new(Empty {})).await?.into_inner())
}

pub async fn notify(address: &str, candidate: NodeInfo) -> Result<(), NodeError> {
    let mut client = connect(address).await?;
    client.notify(Request::new(candidate)).await?;
    Ok(())
}

pub async fn ping(address: &str) -> Result<(), NodeError> {
    let mut client = connect(address).await?;
    client.ping(Request::new(Empty {})).await?;
    Ok(())
}

pub async fn create(address: &str) -> Result<(), NodeError> {
    let mut client = connect(address).await?;
    client.create(Request::new(Empty {})).await?;
    Ok(())
}

pub async fn join(address: &str, known_address: String) -> Result<(), NodeError> {
    let mut client = connect(address).await?;
    client.join(Request::new(JoinRequest { known_address })).await?;
    Ok(())
}

pub async fn shutdown(address: &str) -> Result<(), NodeError> {
    let mut client = connect(address).await?;
    client.shutdown(Request::new(Empty {})).await?;
    Ok(())
}

pub async fn put_local(address: &str, key: String, value: String) -> Result<(), NodeError> {
    let mut client = connect(address).await?;
    client
        .put_local(Request::new(PutLocalRequest { key, value }))
        .await?;
    Ok(())
}

pub async fn get_local(address: &str, key: String) -> Result<(String, bool), NodeError> {
    let mut client = connect(address).await?;
    let resp = client
        .get_local(Request::new(GetLocalRequest { key }))
        .await?
        .into_inner();
    Ok((resp.value, resp.found))
}

pub async fn put(address: &str, key: String, value: String) -> Result<(NodeInfo, u32), NodeError> {
    let mut client = connect(address).await?;
    let resp = client
        .put(Request::new(PutRequest { key, value }))
        .await?
        .into_inner();
    let node = resp
        .storage_node
        .ok_or_else(|| NodeError::TransientRpc("empty put response".into()))?;
    Ok((node, resp.hops))
}

pub async fn get(address: &str, key: String) -> Result<(NodeInfo, u32, String, bool), NodeError> {
    let mut client = connect(address).await?;
    let resp = client
        .get(Request::new(GetRequest { key }))
        .await?
        .into_inner();
    let node = resp
        .storage_node
        .ok_or_else(|| NodeError::TransientRpc("empty get response".into()))?;
    Ok((node, resp.hops, resp.value, resp.found))
}
