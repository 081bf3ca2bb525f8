use std::time::Duration;

use rand::{Rng as _, SeedableRng as _};
use tokio::time::{Instant, sleep};

/// Token-bucket arrival pacer.
///
/// Tokens refill continuously at `rate` per second, capped at `burst`.
/// One call to [`ArrivalPacer::tick`] consumes one token; when the bucket is
/// empty the call sleeps until a token has accrued. Sleeps are jittered,
/// token accounting is not, so the long-term arrival rate converges on
/// `rate` regardless of the jitter setting.
pub(super) struct ArrivalPacer {
    rate: f64,
    capacity: f64,
    tokens: f64,
    last_refill: Instant,
    jitter: f64,
    rng: rand::rngs::SmallRng,
}

impl ArrivalPacer {
    pub(super) fn new(rate: u32, burst: u32, jitter: f64) -> Self {
        Self::with_rng(rate, burst, jitter, rand::rngs::SmallRng::from_os_rng())
    }

    fn with_rng(rate: u32, burst: u32, jitter: f64, rng: rand::rngs::SmallRng) -> Self {
        let rate = rate.max(1) as f64;
        let capacity = burst.max(1) as f64;

        Self {
            rate,
            capacity,
            tokens: capacity,
            last_refill: Instant::now(),
            jitter: jitter.clamp(0.0, 1.0),
            rng,
        }
    }

    /// Waits until the next dispatch slot and consumes it.
    pub(super) async fn tick(&mut self) {
        loop {
            self.refill();

            if self.tokens >= 1.0 {
                self.tokens -= 1.0;
                return;
            }

            let deficit = 1.0 - self.tokens;
            let wait = self.jittered(Duration::from_secs_f64(deficit / self.rate));

            // A zero sleep would spin; always yield at least once.
            let wait = if wait.is_zero() {
                Duration::from_nanos(1)
            } else {
                wait
            };

            sleep(wait).await;
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;

        self.tokens = (self.tokens + dt * self.rate).min(self.capacity);
    }

    fn jittered(&mut self, d: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return d;
        }

        let m = self
            .rng
            .random_range(1.0 - self.jitter..=1.0 + self.jitter);

        Duration::from_secs_f64((d.as_secs_f64() * m).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{task::yield_now, time};

    fn pacer(rate: u32, burst: u32, jitter: f64, seed: u64) -> ArrivalPacer {
        ArrivalPacer::with_rng(rate, burst, jitter, rand::rngs::SmallRng::seed_from_u64(seed))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn burst_tokens_are_available_immediately() {
        time::pause();

        let mut p = pacer(5, 2, 0.0, 7);

        p.tick().await;
        p.tick().await;

        // Bucket is empty and no time has passed, so the next tick blocks.
        let h = tokio::spawn(async move {
            let mut p = p;
            p.tick().await;
        });

        yield_now().await;
        assert!(!h.is_finished());
        h.abort();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ticks_space_out_at_the_configured_rate() {
        time::pause();

        let mut p = pacer(4, 1, 0.0, 11);

        // Burn the burst token; the next slot is 250ms away at 4/s.
        p.tick().await;

        let h = tokio::spawn(async move {
            let mut p = p;
            p.tick().await;
        });

        yield_now().await;
        assert!(!h.is_finished());

        time::advance(Duration::from_millis(249)).await;
        yield_now().await;
        assert!(!h.is_finished());

        time::advance(Duration::from_millis(1)).await;
        h.await.expect("task join");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn refill_never_exceeds_burst_capacity() {
        time::pause();

        let mut p = pacer(1000, 3, 0.0, 13);
        p.tokens = 0.0;
        p.last_refill = Instant::now();

        time::advance(Duration::from_secs(5)).await;

        p.refill();
        assert_eq!(p.tokens, 3.0);
    }

    #[test]
    fn jitter_multiplier_stays_within_bounds() {
        let mut p = pacer(1, 1, 0.5, 17);
        let base = Duration::from_secs(4);

        for _ in 0..32 {
            let j = p.jittered(base).as_secs_f64();
            assert!((2.0..=6.0).contains(&j));
        }
    }

    #[test]
    fn zero_jitter_leaves_the_wait_untouched() {
        let mut p = pacer(1, 1, 0.0, 19);
        let base = Duration::from_millis(125);

        assert_eq!(p.jittered(base), base);
    }
}
