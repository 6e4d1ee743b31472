//! Bounded-concurrency gate for external service calls.
//!
//! Embedding and generation requests go out over HTTP to model servers with
//! rate limits. The gate caps how many calls are in flight at once: callers
//! block until a slot frees up. These calls are the only suspension points in
//! the system — graph building, search, and validation never block.

/// Caps concurrent calls to an external service.
///
/// Backed by a dedicated fixed-size rayon pool: running a call means
/// occupying one of its threads, so at most `max_in_flight` calls execute
/// concurrently regardless of how many worker threads request one.
pub struct ServiceGate {
    pool: rayon::ThreadPool,
}

impl ServiceGate {
    /// Create a gate admitting at most `max_in_flight` concurrent calls.
    pub fn new(max_in_flight: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_in_flight.max(1))
            .thread_name(|i| format!("argmend-svc-{i}"))
            .build()
            .expect("service gate pool spawns");
        Self { pool }
    }

    /// Run one service call inside the gate, blocking until a slot is free.
    pub fn run<T, F>(&self, call: F) -> T
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        self.pool.install(call)
    }
}
