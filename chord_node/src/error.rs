//! The node's typed error hierarchy (§7/§7a). In-process operations return
//! `NodeError`; the `Chord` trait impl converts it to a `tonic::Status` at
//! the RPC boundary.

use thiserror::Error;
use tonic::{Code, Status};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node has already called create/join")]
    AlreadyJoined,

    #[error("rpc failed: {0}")]
    TransientRpc(String),

    #[error("peer {address} reported id {got}, outside the ring of size 2^{m}")]
    RingSizeMismatch { address: String, got: u64, m: u32 },

    #[error("address {address} hashes to the same id {id} as this node")]
    IdCollision { address: String, id: u64 },
}

impl From<Status> for NodeError {
    fn from(status: Status) -> Self {
        NodeError::TransientRpc(status.message().to_string())
    }
}

impl From<NodeError> for Status {
    fn from(err: NodeError) -> Self {
        let message = err.to_string();
        match err {
            NodeError::AlreadyJoined => Status::failed_precondition(message),
            NodeError::TransientRpc(_) => Status::unavailable(message),
            NodeError::RingSizeMismatch { .. } => Status::new(Code::OutOfRange, message),
            NodeError::IdCollision { .. } => Status::already_exists(message),
        }
    }
}
