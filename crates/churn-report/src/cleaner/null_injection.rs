//! Synthetic missing-value injection.
//!
//! The positions come from a caller-supplied RNG so a seeded run blanks the
//! same rows every time.

use crate::config::NullInjection;
use rand::Rng;
use rand::seq::index;
use tracing::warn;

/// Draw distinct row positions to blank out, sorted ascending.
///
/// Positions are drawn uniformly without replacement from the first
/// `injection.window` rows. A table shorter than the window shrinks the
/// window to the table, and the number of positions is capped at the window.
pub fn sample_positions<R: Rng + ?Sized>(
    rng: &mut R,
    height: usize,
    injection: &NullInjection,
) -> Vec<usize> {
    if !injection.enabled {
        return Vec::new();
    }

    let window = injection.window.min(height);
    let amount = injection.rows.min(window);
    if amount < injection.rows {
        warn!(
            "Only {} candidate rows for null injection, blanking {} instead of {}",
            window, amount, injection.rows
        );
    }
    if amount == 0 {
        return Vec::new();
    }

    let mut positions = index::sample(rng, window, amount).into_vec();
    positions.sort_unstable();
    positions
}
