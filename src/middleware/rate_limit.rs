use std::sync::Arc;
use std::time::Duration;
use governor::middleware::NoOpMiddleware;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Per-client limit of `max_requests` per `window`, replenished evenly across
/// the window. Returns `None` when limiting is turned off.
pub fn create_rate_limit_layer(
    window: Duration,
    max_requests: u32,
) -> Option<tower_governor::GovernorLayer<'static, PeerIpKeyExtractor, NoOpMiddleware>> {
    if max_requests == 0 {
        return None;
    }

    let replenish_ms = (window.as_millis() / u128::from(max_requests)).max(1);
    let replenish_ms = u64::try_from(replenish_ms).unwrap_or(u64::MAX);

    let config = GovernorConfigBuilder::default()
        .per_millisecond(replenish_ms)
        .burst_size(max_requests)
        .finish()?;

    Some(tower_governor::GovernorLayer {
        config: Box::leak(Box::new(Arc::new(config))),
    })
}
