// A poisoned lock means a profiler invariant was broken mid-update (we panic).
// Profiler code never runs caller code while holding a lock, so this is never caused by
// a panic in the instrumented workload.
pub(crate) const ERR_POISONED_LOCK: &str = "encountered poisoned lock - aggregate statistics \
    may be partially updated and can no longer be trusted";
