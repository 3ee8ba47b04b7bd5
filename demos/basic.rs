use circuitbreaker_metrics::{BreakerEvent, BreakerHandle, BridgeError, EventBridge, MetricsRegistry};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), BridgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    // One registry for the whole process, served on /metrics by the host
    let registry = Arc::new(MetricsRegistry::new());
    let bridge = EventBridge::builder()
        .registry(Arc::clone(&registry))
        .prefix("resolver_")
        .build()?;

    let dns = BreakerHandle::new("dns").with_group("resolvers");
    let http = BreakerHandle::new("http").with_group("resolvers");
    bridge.bind(&dns)?;
    bridge.bind(&http)?;

    // Whatever runs the breakers reports what happened to each call
    for attempt in 0..5u64 {
        dns.emit(BreakerEvent::Exec);
        let start = Instant::now();
        thread::sleep(Duration::from_millis(5 * (attempt + 1)));
        if attempt % 2 == 0 {
            dns.emit(BreakerEvent::Success(start.elapsed()));
        } else {
            dns.emit(BreakerEvent::Failure(start.elapsed()));
        }
    }

    http.emit(BreakerEvent::Exec);
    http.emit(BreakerEvent::Timeout(Duration::from_secs(2)));
    http.emit(BreakerEvent::CircuitOpen);
    http.emit(BreakerEvent::HealthCheckFailed);
    http.emit(BreakerEvent::CircuitClosed);

    bridge.unbind(&http);

    println!("{}", registry.encode()?);
    Ok(())
}
