//! `cyb-cli inspect ...`

use anyhow::Result;
use cyb_breaker::CircuitBreaker;
use cyb_cache::DeterministicCache;
use cyb_core::Priority;
use cyb_ratelimit::RateLimiter;

use crate::cli::InspectTarget;

pub fn run(target: InspectTarget, cache: &DeterministicCache, breaker: &CircuitBreaker, ratelimiter: &RateLimiter) -> Result<()> {
    match target {
        InspectTarget::Cache => {
            let stats = cache.stats();
            println!(
                "entries={} hit_rate={:.4} false_positive_rate={:.4} hits={} misses={} puts={} evictions={}",
                cache.len(),
                cache.hit_rate(),
                cache.false_positive_rate(),
                stats.hits,
                stats.misses,
                stats.puts,
                stats.evictions,
            );
        }
        InspectTarget::Breaker { service_id } => {
            let snapshot = breaker.snapshot(&service_id);
            println!(
                "{}: state={:?} failure_count={} next_probe_at={:?}",
                snapshot.service_id, snapshot.state, snapshot.failure_count, snapshot.next_probe_at
            );
        }
        InspectTarget::Budget { budget, subject } => {
            let consumed = ratelimiter.consumed(&budget, &subject, Priority::Normal);
            println!("{budget}/{subject}: consumed={consumed}");
        }
    }
    Ok(())
}
