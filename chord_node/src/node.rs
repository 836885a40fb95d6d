use crate::error::NodeError;
use crate::ring;
use crate::rpc_client;
use chord_proto::chord::chord_server::Chord;
use chord_proto::chord::{
    Empty, FindSuccessorRequest, FindSuccessorResponse, GetLocalRequest, GetLocalResponse,
    GetRequest, GetResponse, JoinRequest, NodeInfo, PutLocalRequest, PutRequest, PutResponse,
};
use chord_proto::hash_id;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tonic::{Request, Response, Status};

#[derive(Debug, Clone)]
pub struct Node {
    pub id: u64,
    pub addr: String,
    pub m: u32,
    pub state: Arc<RwLock<NodeState>>,
    joined: Arc<AtomicBool>,
    next_finger: Arc<AtomicUsize>,
    pub shutdown: Arc<Notify>,
}

#[derive(Debug)]
pub struct NodeState {
    pub predecessor: Option<NodeInfo>,
    pub successor: NodeInfo,
    pub finger_table: Vec<NodeInfo>,
    pub store: HashMap<String, String>,
}

impl Node {
    pub fn new(id: u64, addr: String, m: u32) -> Self {
        let self_info = NodeInfo { id, address: addr.clone() };
        let finger_table = vec![self_info.clone(); m as usize];

        Node {
            id,
            addr,
            m,
            state: Arc::new(RwLock::new(NodeState {
                predecessor: None,
                successor: self_info,
                finger_table,
                store: HashMap::new(),
            })),
            joined: Arc::new(AtomicBool::new(false)),
            next_finger: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    fn self_info(&self) -> NodeInfo {
        NodeInfo { id: self.id, address: self.addr.clone() }
    }

    fn mark_joined(&self) -> Result<(), NodeError> {
        self.joined
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| NodeError::AlreadyJoined)
    }

    /// Becomes the sole member of a fresh ring (§4.3 `create`). Exposed both
    /// as a library call for process startup and, via the `Chord` trait
    /// impl below, as the `create` RPC.
    pub async fn do_create(&self) -> Result<(), NodeError> {
        self.mark_joined()?;
        let mut state = self.state.write().await;
        state.predecessor = None;
        state.successor = self.self_info();
        for finger in state.finger_table.iter_mut() {
            *finger = self.self_info();
        }
        info!("node {}: created new ring", self.id);
        Ok(())
    }

    /// Joins an existing ring through `known_addr` (§4.3 `join`).
    pub async fn do_join(&self, known_addr: String) -> Result<(), NodeError> {
        self.mark_joined()?;
        match rpc_client::find_successor(&known_addr, self.id).await {
            Ok((successor, _hops)) => {
                if !ring::validate_id(successor.id, self.m) {
                    self.joined.store(false, Ordering::SeqCst);
                    return Err(NodeError::RingSizeMismatch {
                        address: successor.address,
                        got: successor.id,
                        m: self.m,
                    });
                }
                if successor.id == self.id && successor.address != self.addr {
                    self.joined.store(false, Ordering::SeqCst);
                    return Err(NodeError::IdCollision { address: successor.address, id: self.id });
                }
                let mut state = self.state.write().await;
                state.predecessor = None;
                state.successor = successor.clone();
                state.finger_table[0] = successor.clone();
                info!(
                    "node {}: joined ring via {} (successor {})",
                    self.id, known_addr, successor.id
                );
                Ok(())
            }
            Err(e) => {
                self.joined.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// §4.2 `find_successor`, recursive with the single-successor fallback
    /// this toy design relies on instead of a successor list.
    pub async fn find_successor_internal(&self, id: u64) -> Result<(NodeInfo, u32), NodeError> {
        let successor = { self.state.read().await.successor.clone() };

        if ring::between_open_closed(id, self.id, successor.id) {
            return Ok((successor, 1));
        }

        let n_prime = self.closest_preceding_finger_internal(id).await;
        if n_prime.id == self.id {
            return Ok((successor, 1));
        }

        match rpc_client::find_successor(&n_prime.address, id).await {
            Ok((node, hops)) => Ok((node, hops + 1)),
            Err(e) => {
                warn!(
                    "node {}: find_successor hop to {} failed ({}), falling back to successor {}",
                    self.id, n_prime.id, e, successor.id
                );
                Ok((successor, 1))
            }
        }
    }

    /// §4.2 `closest_preceding_finger`: scan from `m-1` down to `0`.
    async fn closest_preceding_finger_internal(&self, id: u64) -> NodeInfo {
        let state = self.state.read().await;
        for finger in state.finger_table.iter().rev() {
            if ring::between_open_open(finger.id, self.id, id) {
                return finger.clone();
            }
        }
        self.self_info()
    }

    /// §4.3 `stabilize`, run periodically by the maintenance loop.
    pub async fn stabilize(&self) {
        let successor = { self.state.read().await.successor.clone() };

        if successor.id != self.id {
            match rpc_client::get_predecessor(&successor.address).await {
                Ok(Some(x)) => {
                    if ring::between_open_open(x.id, self.id, successor.id) {
                        debug!(
                            "node {}: adopting {} as new successor (was {})",
                            self.id, x.id, successor.id
                        );
                        let mut state = self.state.write().await;
                        state.successor = x.clone();
                        state.finger_table[0] = x;
                    }
                }
                Ok(None) => {
                    // Successor is alive but has no predecessor yet; nothing to do.
                }
                Err(e) => {
                    // Without a successor list the ring cannot self-heal a dead
                    // successor here (§4.3, §7); leave it and let fix_fingers
                    // eventually route around it.
                    warn!("node {}: stabilize could not reach successor {}: {}", self.id, successor.id, e);
                    return;
                }
            }
        }

        let successor = { self.state.read().await.successor.clone() };
        if let Err(e) = rpc_client::notify(&successor.address, self.self_info()).await {
            warn!("node {}: failed to notify successor {}: {}", self.id, successor.id, e);
        }
    }

    /// §4.3 `notify`, the inbound half of stabilization. Adopts `candidate`
    /// as predecessor when appropriate and transfers the key range it now
    /// owns via per-key `put_local` calls.
    async fn notify(&self, candidate: NodeInfo) {
        let mut state = self.state.write().await;

        let should_update = match &state.predecessor {
            None => true,
            Some(pred) => ring::between_open_open(candidate.id, pred.id, self.id),
        };
        if !should_update {
            return;
        }

        let old_predecessor = state.predecessor.replace(candidate.clone());

        let mut to_transfer = Vec::new();
        state.store.retain(|k, v| {
            let key_id = hash_id(k, self.m);
            let belongs_to_candidate = match &old_predecessor {
                Some(old) => ring::between_open_closed(key_id, old.id, candidate.id),
                None => !ring::between_open_closed(key_id, candidate.id, self.id),
            };
            if belongs_to_candidate {
                to_transfer.push((k.clone(), v.clone()));
                false
            } else {
                true
            }
        });
        drop(state);

        if to_transfer.is_empty() {
            return;
        }
        info!(
            "node {}: transferring {} key(s) to new predecessor {}",
            self.id,
            to_transfer.len(),
            candidate.id
        );
        for (key, value) in to_transfer {
            if let Err(e) = rpc_client::put_local(&candidate.address, key.clone(), value).await {
                warn!("node {}: failed to transfer key '{}' to {}: {}", self.id, key, candidate.id, e);
            }
        }
    }

    /// §4.3 `fix_fingers`: advances a rolling index through `[0, m)` each tick.
    pub async fn fix_fingers(&self) {
        if self.m == 0 {
            return;
        }
        let i = self.next_finger.fetch_add(1, Ordering::SeqCst) % self.m as usize;
        let start = ring::finger_start(self.id, i as u32, self.m);
        match self.find_successor_internal(start).await {
            Ok((node, _hops)) => {
                let mut state = self.state.write().await;
                state.finger_table[i] = node;
            }
            Err(e) => warn!("node {}: fix_fingers[{}] failed: {}", self.id, i, e),
        }
    }

    /// §4.3 `check_predecessor`: a cheap liveness probe, clearing a dead
    /// predecessor.
    pub async fn check_predecessor(&self) {
        let predecessor = { self.state.read().await.predecessor.clone() };
        let Some(pred) = predecessor else { return };

        if rpc_client::ping(&pred.address).await.is_err() {
            info!("node {}: predecessor {} is unreachable, clearing", self.id, pred.id);
            let mut state = self.state.write().await;
            if state.predecessor.as_ref().map(|p| p.id) == Some(pred.id) {
                state.predecessor = None;
            }
        }
    }
}

#[tonic::async_trait]
impl Chord for Node {
    async fn get_successor(&self, _request: Request<Empty>) -> Result<Response<NodeInfo>, Status> {
        let state = self.state.read().await;
        Ok(Response::new(state.successor.clone()))
    }

    async fn get_predecessor(&self, _request: Request<Empty>) -> Result<Response<NodeInfo>, Status> {
        let state = self.state.read().await;
        state
            .predecessor
            .clone()
            .map(Response::new)
            .ok_or_else(|| Status::not_found("no predecessor"))
    }

    async fn find_successor(
        &self,
        request: Request<FindSuccessorRequest>,
    ) -> Result<Response<FindSuccessorResponse>, Status> {
        let id = request.into_inner().id;
        if !ring::validate_id(id, self.m) {
            return Err(NodeError::RingSizeMismatch { address: self.addr.clone(), got: id, m: self.m }.into());
        }
        let (node, hops) = self.find_successor_internal(id).await?;
        Ok(Response::new(FindSuccessorResponse { node: Some(node), hops }))
    }

    async fn closest_preceding_finger(
        &self,
        request: Request<FindSuccessorRequest>,
    ) -> Result<Response<NodeInfo>, Status> {
        let id = request.into_inner().id;
        Ok(Response::new(self.closest_preceding_finger_internal(id).await))
    }

    async fn notify(&self, request: Request<NodeInfo>) -> Result<Response<Empty>, Status> {
        self.notify(request.into_inner()).await;
        Ok(Response::new(Empty {}))
    }

    async fn create(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        self.do_create().await?;
        Ok(Response::new(Empty {}))
    }

    async fn join(&self, request: Request<JoinRequest>) -> Result<Response<Empty>, Status> {
        let known_address = request.into_inner().known_address;
        self.do_join(known_address).await?;
        Ok(Response::new(Empty {}))
    }

    async fn get_local(
        &self,
        request: Request<GetLocalRequest>,
    ) -> Result<Response<GetLocalResponse>, Status> {
        let key = request.into_inner().key;
        let state = self.state.read().await;
        match state.store.get(&key) {
            Some(value) => Ok(Response::new(GetLocalResponse { value: value.clone(), found: true })),
            None => Ok(Response::new(GetLocalResponse { value: String::new(), found: false })),
        }
    }

    async fn put_local(&self, request: Request<PutLocalRequest>) -> Result<Response<Empty>, Status> {
        let req = request.into_inner();
        let mut state = self.state.write().await;
        state.store.insert(req.key, req.value);
        Ok(Response::new(Empty {}))
    }

    async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        let key = request.into_inner().key;
        let key_id = hash_id(&key, self.m);
        let (target, hops) = self.find_successor_internal(key_id).await?;

        let (value, found) = if target.id == self.id {
            let state = self.state.read().await;
            match state.store.get(&key) {
                Some(v) => (v.clone(), true),
                None => (String::new(), false),
            }
        } else {
            rpc_client::get_local(&target.address, key).await?
        };

        Ok(Response::new(GetResponse { storage_node: Some(target), hops, value, found }))
    }

    async fn put(&self, request: Request<PutRequest>) -> Result<Response<PutResponse>, Status> {
        let req = request.into_inner();
        let key_id = hash_id(&req.key, self.m);
        let (target, hops) = self.find_successor_internal(key_id).await?;

        if target.id == self.id {
            let mut state = self.state.write().await;
            state.store.insert(req.key, req.value);
        } else {
            rpc_client::put_local(&target.address, req.key, req.value).await?;
        }

        Ok(Response::new(PutResponse { storage_node: Some(target), hops }))
    }

    async fn shutdown(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        info!("node {}: shutdown requested", self.id);
        self.shutdown.notify_waiters();
        Ok(Response::new(Empty {}))
    }

    async fn ping(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        Ok(Response::new(Empty {}))
    }
}
