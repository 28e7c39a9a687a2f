use std::collections::{HashMap, VecDeque};

use scenelink_shared::Rtid;

use crate::error::BrokerError;

use super::message::EntityRecord;

/// The request kinds the broker link carries. Each kind owns its own FIFO of
/// pending completions; confirmations complete the oldest pending request of
/// their kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Spawn,
    Delete,
    Find,
    ResolveAncestors,
    Children,
    UpdateComponents,
}

impl RequestKind {
    /// The request's `type` tag, used to match `requestFailed` answers
    pub fn tag(&self) -> &'static str {
        match self {
            RequestKind::Spawn => "spawnEntity",
            RequestKind::Delete => "deleteEntities",
            RequestKind::Find => "findEntities",
            RequestKind::ResolveAncestors => "resolveAncestors",
            RequestKind::Children => "getChildren",
            RequestKind::UpdateComponents => "updateComponents",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "spawnEntity" => Some(RequestKind::Spawn),
            "deleteEntities" => Some(RequestKind::Delete),
            "findEntities" => Some(RequestKind::Find),
            "resolveAncestors" => Some(RequestKind::ResolveAncestors),
            "getChildren" => Some(RequestKind::Children),
            "updateComponents" => Some(RequestKind::UpdateComponents),
            _ => None,
        }
    }
}

/// Handle for one in-flight request; redeem it with
/// [`crate::BrokerChannel::take_response`] once its confirmation arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub(crate) kind: RequestKind,
    pub(crate) id: u64,
}

impl ResponseKey {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

/// A completed request's decoded payload
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    Spawned(EntityRecord),
    Deleted(Vec<Rtid>),
    Found(Vec<EntityRecord>),
    Ancestors(Vec<EntityRecord>),
    Children(Vec<EntityRecord>),
    Updated,
}

/// Per-kind FIFO queues of pending completions plus the store of completed
/// responses awaiting pickup.
pub struct PendingRequests {
    queues: HashMap<RequestKind, VecDeque<u64>>,
    completed: HashMap<u64, Result<ResponsePayload, BrokerError>>,
    next_id: u64,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            queues: HashMap::new(),
            completed: HashMap::new(),
            next_id: 0,
        }
    }

    /// Registers a new pending request of `kind`, returning its key
    pub fn push(&mut self, kind: RequestKind) -> ResponseKey {
        let id = self.next_id;
        self.next_id += 1;
        self.queues.entry(kind).or_default().push_back(id);
        ResponseKey { kind, id }
    }

    /// Completes the oldest pending request of `kind`. Errors if nothing of
    /// that kind is pending: the server confirmed something we never asked.
    pub fn complete_oldest(
        &mut self,
        kind: RequestKind,
        result: Result<ResponsePayload, BrokerError>,
    ) -> Result<ResponseKey, BrokerError> {
        let id = self
            .queues
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .ok_or(BrokerError::UnexpectedConfirmation { kind })?;
        self.completed.insert(id, result);
        Ok(ResponseKey { kind, id })
    }

    /// Hands a completed response to its caller, if ready
    pub fn take(&mut self, key: &ResponseKey) -> Option<Result<ResponsePayload, BrokerError>> {
        self.completed.remove(&key.id)
    }

    /// Fails every outstanding pending request; used on disconnect so no
    /// waiter is leaked.
    pub fn fail_all(&mut self, error: BrokerError) {
        for (_, mut queue) in self.queues.drain() {
            for id in queue.drain(..) {
                self.completed.insert(id, Err(error.clone()));
            }
        }
    }

    pub fn outstanding(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_are_fifo_per_kind() {
        let mut pending = PendingRequests::new();
        let first = pending.push(RequestKind::Find);
        let second = pending.push(RequestKind::Find);
        let other = pending.push(RequestKind::Delete);

        let completed = pending
            .complete_oldest(RequestKind::Find, Ok(ResponsePayload::Found(vec![])))
            .unwrap();
        assert_eq!(completed, first);
        assert!(pending.take(&first).is_some());
        assert!(pending.take(&second).is_none());
        assert!(pending.take(&other).is_none());
        assert_eq!(pending.outstanding(), 2);
    }

    #[test]
    fn confirmation_without_pending_request_errors() {
        let mut pending = PendingRequests::new();
        let result = pending.complete_oldest(RequestKind::Spawn, Ok(ResponsePayload::Updated));
        assert_eq!(
            result,
            Err(BrokerError::UnexpectedConfirmation {
                kind: RequestKind::Spawn
            })
        );
    }

    #[test]
    fn fail_all_completes_every_waiter() {
        let mut pending = PendingRequests::new();
        let keys = [
            pending.push(RequestKind::Find),
            pending.push(RequestKind::Spawn),
            pending.push(RequestKind::Find),
        ];
        pending.fail_all(BrokerError::ChannelClosed);
        assert_eq!(pending.outstanding(), 0);
        for key in keys {
            assert_eq!(pending.take(&key), Some(Err(BrokerError::ChannelClosed)));
        }
    }
}
