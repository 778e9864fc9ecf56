//! Usable-token budget policy.

use parley_types::budget::BudgetParams;

/// Budget used when the configured overhead exceeds the ceiling.
pub const USABLE_FLOOR: u32 = 1_000;

/// Tokens left for conversation turns once the fixed overhead is taken out.
///
/// `overhead_tokens` is the system prompt cost plus the reminder cost. A
/// negative result means the configuration cannot fit anything; it is
/// clamped to [`USABLE_FLOOR`] and reported at `warn`.
pub fn compute_usable_tokens(
    ceiling: u32,
    reserved_completion: u32,
    pad: u32,
    overhead_tokens: u32,
) -> u32 {
    let usable = i64::from(ceiling)
        - (i64::from(overhead_tokens) + i64::from(pad) + i64::from(reserved_completion));
    if usable < 0 {
        tracing::warn!(
            ceiling,
            reserved_completion,
            pad,
            overhead_tokens,
            floor = USABLE_FLOOR,
            "token budget is negative, clamping to floor"
        );
        return USABLE_FLOOR;
    }
    u32::try_from(usable).unwrap_or(u32::MAX)
}

/// [`compute_usable_tokens`] over a [`BudgetParams`].
pub fn usable_for(budget: &BudgetParams, overhead_tokens: u32) -> u32 {
    compute_usable_tokens(
        budget.ceiling,
        budget.reserved_completion,
        budget.pad,
        overhead_tokens,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use super::*;

    /// Counts `warn` events.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn warnings_during<T>(f: impl FnOnce() -> T) -> (T, usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&count)));
        let value = tracing::subscriber::with_default(subscriber, f);
        (value, count.load(Ordering::SeqCst))
    }

    #[test]
    fn test_usable_tokens() {
        assert_eq!(compute_usable_tokens(100, 20, 10, 0), 70);
        assert_eq!(compute_usable_tokens(8_000, 1_000, 500, 120), 6_380);
    }

    #[test]
    fn test_exact_fit_is_zero_not_floor() {
        assert_eq!(compute_usable_tokens(100, 50, 50, 0), 0);
    }

    #[test]
    fn test_negative_budget_clamps_to_floor() {
        assert_eq!(compute_usable_tokens(100, 200, 10, 5), USABLE_FLOOR);
    }

    #[test]
    fn test_floor_clamp_warns() {
        let (usable, warnings) = warnings_during(|| compute_usable_tokens(100, 200, 10, 5));
        assert_eq!(usable, USABLE_FLOOR);
        assert_eq!(warnings, 1);

        let (usable, warnings) = warnings_during(|| compute_usable_tokens(100, 50, 50, 0));
        assert_eq!(usable, 0);
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_usable_for_params() {
        let budget = BudgetParams::new(100, 20, 10, None);
        assert_eq!(usable_for(&budget, 30), 40);
    }
}
