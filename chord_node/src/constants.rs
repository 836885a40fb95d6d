pub const DEFAULT_RING_BITS: u32 = 32;
pub const DEFAULT_PORT: u16 = 5000;
pub const LOCALHOST: &str = "127.0.0.1";

// Intervals
pub const STABILIZATION_INTERVAL_MS: u64 = 1000;
pub const FIX_FINGERS_INTERVAL_MS: u64 = 1000;
pub const CHECK_PREDECESSOR_INTERVAL_MS: u64 = 1000;

// RPC timeout (§5, "bounded timeout, e.g. 2-5s").
pub const RPC_TIMEOUT_MS: u64 = 3000;
