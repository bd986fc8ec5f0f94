//! Order reference generation.
//!
//! References look like `COM482`: a fixed prefix plus a number drawn from
//! [100, 1000). The space is small, so the workflow retries on collision and
//! gives up after a bounded number of attempts.

use rand::Rng;

pub const ORDER_NUM_PREFIX: &str = "COM";

/// How many candidate references the workflow tries before reporting a
/// conflict to the caller.
pub const MAX_ORDER_NUM_ATTEMPTS: usize = 5;

/// Draws one candidate order reference.
pub fn generate_order_num<R: Rng>(rng: &mut R) -> String {
    format!("{ORDER_NUM_PREFIX}{}", rng.gen_range(100..1000))
}
