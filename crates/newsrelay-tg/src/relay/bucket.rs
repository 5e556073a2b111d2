use std::time::Duration;
use tokio::time::Instant;

/// Token bucket that limits the rate of publishing. It lets through a burst of
/// up to `capacity` posts, and then refills continuously at the rate of
/// `capacity` tokens per `refill_interval`.
///
/// Invariant: `0.0 <= tokens <= capacity`
#[derive(Debug, Clone)]
pub(crate) struct TokenBucket {
    capacity: u32,
    refill_interval: Duration,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket
    pub(crate) fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self::new_at(capacity, refill_interval, Instant::now())
    }

    fn new_at(capacity: u32, refill_interval: Duration, now: Instant) -> Self {
        Self {
            capacity,
            refill_interval,
            tokens: capacity.into(),
            last_refill: now,
        }
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    pub(crate) fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    /// Number of tokens as of the last refill
    pub(crate) fn tokens(&self) -> f64 {
        self.tokens
    }

    pub(crate) fn refill(&mut self) {
        self.refill_at(Instant::now());
    }

    pub(crate) fn can_post_now(&mut self) -> bool {
        self.can_post_at(Instant::now())
    }

    pub(crate) fn consume_token(&mut self) {
        self.consume_token_at(Instant::now());
    }

    /// Changes the rate limit. The bucket becomes full.
    pub(crate) fn reconfigure(&mut self, capacity: u32, refill_interval: Duration) {
        *self = Self::new(capacity, refill_interval);
    }

    fn refill_at(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let capacity = f64::from(self.capacity);

        // Zero interval is rejected by the config validation, but the bucket
        // must not produce NaN even if it slips through
        let rate = if self.refill_interval.is_zero() {
            f64::INFINITY
        } else {
            capacity / self.refill_interval.as_secs_f64()
        };

        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate).min(capacity);
        self.last_refill = self.last_refill.max(now);
    }

    fn can_post_at(&mut self, now: Instant) -> bool {
        self.refill_at(now);
        self.tokens >= 1.0
    }

    fn consume_token_at(&mut self, now: Instant) {
        self.refill_at(now);
        self.tokens = (self.tokens - 1.0).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_tokens(bucket: &TokenBucket, expected: f64) {
        assert!(
            (bucket.tokens() - expected).abs() < EPSILON,
            "expected {expected} tokens, got {}",
            bucket.tokens()
        );
    }

    #[test]
    fn starts_full() {
        let bucket = TokenBucket::new(3, Duration::from_secs(900));
        assert_tokens(&bucket, 3.0);
    }

    #[test]
    fn refill_is_proportional_to_elapsed_time_and_capped() {
        let t0 = Instant::now();
        let capacity = 4;
        let interval = Duration::from_secs(120);

        for elapsed_secs in [0.0, 0.5, 1.0, 15.0, 29.999, 30.0, 61.0, 120.0, 500.0] {
            let mut bucket = TokenBucket::new_at(capacity, interval, t0);

            // Drain the bucket to observe the refill
            for _ in 0..capacity {
                bucket.consume_token_at(t0);
            }
            let tokens_before = bucket.tokens();
            assert_tokens(&bucket, 0.0);

            bucket.refill_at(t0 + Duration::from_secs_f64(elapsed_secs));

            let expected = (tokens_before + elapsed_secs * 4.0 / 120.0).min(4.0);
            assert_tokens(&bucket, expected);
        }
    }

    #[test]
    fn refill_accumulates_across_partial_steps() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new_at(2, Duration::from_secs(600), t0);
        bucket.consume_token_at(t0);
        bucket.consume_token_at(t0);

        bucket.refill_at(t0 + Duration::from_secs(100));
        bucket.refill_at(t0 + Duration::from_secs(250));
        assert!(!bucket.can_post_at(t0 + Duration::from_secs(299)));
        assert!(bucket.can_post_at(t0 + Duration::from_secs(310)));
        assert_tokens(&bucket, 310.0 / 300.0);
    }

    #[test]
    fn can_post_iff_at_least_one_token() {
        let t0 = Instant::now();
        let drained = || {
            let mut bucket = TokenBucket::new_at(1, Duration::from_secs(100), t0);
            assert!(bucket.can_post_at(t0));
            bucket.consume_token_at(t0);
            assert!(!bucket.can_post_at(t0));
            bucket
        };

        // 0.99 tokens is still not enough
        assert!(!drained().can_post_at(t0 + Duration::from_secs(99)));
        assert!(drained().can_post_at(t0 + Duration::from_secs(100)));
    }

    #[test]
    fn consume_subtracts_exactly_one_and_never_goes_negative() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new_at(3, Duration::from_secs(300), t0);

        bucket.consume_token_at(t0);
        assert_tokens(&bucket, 2.0);

        bucket.consume_token_at(t0);
        bucket.consume_token_at(t0);
        assert_tokens(&bucket, 0.0);

        bucket.consume_token_at(t0);
        assert_tokens(&bucket, 0.0);

        // 50s refill 0.5 tokens, consuming floors at zero
        bucket.consume_token_at(t0 + Duration::from_secs(50));
        assert_tokens(&bucket, 0.0);
    }

    #[test]
    fn time_going_backwards_does_not_remove_tokens() {
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(10);
        let mut bucket = TokenBucket::new_at(2, Duration::from_secs(600), later);
        bucket.consume_token_at(later);

        bucket.refill_at(t0);
        assert_tokens(&bucket, 1.0);
    }

    #[test]
    fn reconfigure_resets_to_full_capacity() {
        let mut bucket = TokenBucket::new(2, Duration::from_secs(600));
        bucket.consume_token();
        bucket.consume_token();
        assert!(!bucket.can_post_now());

        bucket.reconfigure(3, Duration::from_secs(900));

        assert_eq!(bucket.capacity(), 3);
        assert_eq!(bucket.refill_interval(), Duration::from_secs(900));
        assert_tokens(&bucket, 3.0);
    }
}
