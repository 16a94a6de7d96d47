use super::core::ClientState;
use super::inflight::InflightSnapshot;

/// Point-in-time view of the client for health checks and logging.
///
/// `inflight` is `None` while the client holds no tracker (not started, or stopped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalsSnapshot {
    pub state: ClientState,
    pub inflight: Option<InflightSnapshot>,
}
