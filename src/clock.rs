// src/clock.rs
use once_cell::sync::Lazy;
use std::time::Instant;

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

/// Seconds since the first call in this process. Monotonic.
pub fn local_clock() -> f64 {
    EPOCH.elapsed().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let a = local_clock();
        let b = local_clock();
        assert!(b >= a);
        assert!(a >= 0.0);
    }
}
