use super::BoundedWindow;

/// Neutral reading returned until the window holds a full period.
pub const NEUTRAL_RSI: f64 = 50.0;

const EPSILON: f64 = 1e-6;

/// Simple-average RSI over the consecutive differences inside `prices`.
///
/// Returns [`NEUTRAL_RSI`] while fewer than `period` prices are present.
/// Losses are epsilon-protected, so a window with no losses reads ~100.
pub fn rsi(prices: &BoundedWindow, period: usize) -> f64 {
    if prices.len() < period || prices.len() < 2 {
        return NEUTRAL_RSI;
    }

    let steps = (prices.len() - 1) as f64;
    let (gain_sum, loss_sum) = prices
        .iter()
        .zip(prices.iter().skip(1))
        .fold((0.0, 0.0), |(gains, losses), (prev, next)| {
            let change = next - prev;
            (gains + change.max(0.0), losses + (-change).max(0.0))
        });

    let avg_gain = gain_sum / steps;
    let avg_loss = loss_sum / steps;
    100.0 - 100.0 / (1.0 + avg_gain / (avg_loss + EPSILON))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_of(values: &[f64], capacity: usize) -> BoundedWindow {
        let mut window = BoundedWindow::new(capacity);
        values.iter().for_each(|v| window.push(*v));
        window
    }

    #[test]
    fn neutral_until_period_filled() {
        for n in 0..14 {
            let prices: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
            assert_eq!(rsi(&window_of(&prices, 14), 14), NEUTRAL_RSI);
        }
    }

    #[test]
    fn no_losses_reads_hundred() {
        let prices: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        let value = rsi(&window_of(&prices, 14), 14);
        assert!((value - 100.0).abs() < 1e-3, "got {}", value);
    }

    #[test]
    fn no_gains_reads_zero() {
        let prices: Vec<f64> = (0..14).map(|i| 100.0 - i as f64).collect();
        assert_eq!(rsi(&window_of(&prices, 14), 14), 0.0);
    }

    #[test]
    fn balanced_moves_read_fifty() {
        let value = rsi(&window_of(&[100.0, 101.0, 100.0], 3), 3);
        assert!((value - 50.0).abs() < 1e-3, "got {}", value);
    }

    #[test]
    fn matches_hand_computed_value() {
        // Changes: +2, -1, +3 -> avg gain 5/3, avg loss 1/3, RS ~= 5.
        let value = rsi(&window_of(&[10.0, 12.0, 11.0, 14.0], 4), 4);
        let expected = 100.0 - 100.0 / (1.0 + (5.0 / 3.0) / (1.0 / 3.0 + EPSILON));
        assert!((value - expected).abs() < 1e-9);
        assert!((value - 83.333).abs() < 1e-2);
    }
}
