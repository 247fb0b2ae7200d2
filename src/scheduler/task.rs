use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::outcome::Outcome;

/// Handle for one in-flight asynchronous execution of a node's
/// operation.
///
/// A node may have several running tasks at once — re-triggering before
/// completion is allowed and deliberately not serialized. The cache
/// reflects whichever completion lands last.
#[derive(Clone, Debug)]
pub struct RunningTask {
    /// Unique id of this dispatch.
    pub id: Uuid,
    /// Name of the node whose operation is running.
    pub node: String,
    /// Token cancelling this task (shared per node).
    pub cancel: CancellationToken,
}

/// Message delivered from a worker task back to the coordinator.
///
/// `outcome` is `None` for a cancelled task — a tombstone that must
/// never touch the cache.
#[derive(Debug)]
pub(crate) struct TaskCompletion {
    pub task: Uuid,
    pub node: String,
    pub outcome: Option<Outcome>,
}
