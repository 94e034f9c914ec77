use std::collections::BTreeMap;

use crate::config::AutosizeConfig;
use crate::layout::{LevelLayout, ResizeRequest};

/// Debounced auto-resize queue. The allocator only *wishes* for growth;
/// the host schedules those wishes here with its own clock and applies
/// whatever [`Debouncer::fire_due`] releases. Nothing in here spawns a
/// timer or touches shared state, so tests drive time explicitly.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    delay_ms: u64,
    pending: BTreeMap<String, (u64, ResizeRequest)>,
}

impl Debouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &AutosizeConfig) -> Self {
        Self::new(config.debounce_ms)
    }

    /// Queue a growth request. An earlier pending request for the same
    /// node is replaced, which also restarts its delay.
    pub fn schedule(&mut self, request: ResizeRequest, now_ms: u64) {
        self.pending
            .insert(request.node.clone(), (now_ms + self.delay_ms, request));
    }

    /// Drop the pending request for one node, if any.
    pub fn cancel(&mut self, node: &str) -> bool {
        self.pending.remove(node).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Release every request whose delay has elapsed, in node-id order.
    pub fn fire_due(&mut self, now_ms: u64) -> Vec<ResizeRequest> {
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, (due_ms, _))| *due_ms <= now_ms)
            .map(|(node, _)| node.clone())
            .collect();
        due.iter()
            .filter_map(|node| self.pending.remove(node).map(|(_, request)| request))
            .collect()
    }

    /// Fold a fresh layout pass into the queue: nodes the pass wants grown
    /// are (re)scheduled, nodes it laid out without a growth wish lose any
    /// stale pending request. Nodes outside this layout's level are left
    /// alone.
    pub fn reconcile(&mut self, layout: &LevelLayout, now_ms: u64) {
        for node in layout.handles.keys() {
            if let Some(request) = layout
                .resize_requests
                .iter()
                .find(|request| &request.node == node)
            {
                self.schedule(request.clone(), now_ms);
            } else {
                self.cancel(node);
            }
        }
    }
}
