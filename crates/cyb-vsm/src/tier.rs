//! Shared wiring for subscribing a tier's handler to its `vsm.s<n>.*`
//! queue (spec §4.11, §6 bus routing keys).

use std::sync::Arc;

use cyb_bus::{Handler, InMemoryMessageBus, QueuePolicy};

use crate::error::VsmResult;

/// Subscribe `handler` to `queue_name` bound against `vsm.s<n>.*`.
///
/// # Errors
///
/// Returns an error if `queue_name` is already registered.
pub fn subscribe_tier(
    bus: &InMemoryMessageBus,
    tier: u8,
    queue_name: impl Into<String>,
    handler: Arc<dyn Handler>,
    policy: QueuePolicy,
) -> VsmResult<()> {
    let pattern = format!("vsm.s{tier}.*");
    bus.subscribe(queue_name, vec![pattern], handler, policy)?;
    Ok(())
}
