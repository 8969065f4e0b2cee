use super::BoundedWindow;

/// Latest volume must exceed this multiple of the preceding mean.
pub const SPIKE_RATIO: f64 = 1.5;

/// Compares the newest volume with the mean of everything before it.
/// Never fires until the window is full.
pub fn volume_spike(volumes: &BoundedWindow) -> bool {
    if !volumes.is_full() || volumes.len() < 2 {
        return false;
    }
    let Some(latest) = volumes.last() else {
        return false;
    };

    let prior = volumes.len() - 1;
    let prior_mean = volumes.iter().take(prior).sum::<f64>() / prior as f64;
    latest > SPIKE_RATIO * prior_mean
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
    fn silent_before_window_full() {
        assert!(!volume_spike(&window_of(&[1.0, 1.0, 50.0], 10)));
        assert!(!volume_spike(&window_of(&[1.0; 9], 10)));
    }

    #[test]
    fn fires_on_large_latest_volume() {
        let mut values = vec![2.0; 9];
        values.push(4.0);
        assert!(volume_spike(&window_of(&values, 10)));
    }

    #[test]
    fn threshold_is_strict() {
        let mut values = vec![2.0; 9];
        values.push(3.0);
        assert!(!volume_spike(&window_of(&values, 10)));
    }

    #[test]
    fn newest_volume_excluded_from_baseline() {
        // Including the latest value would lift the mean to 2.8 and hide the spike.
        let values = [1.0, 1.0, 1.0, 1.0, 10.0];
        assert!(volume_spike(&window_of(&values, 5)));
    }
}
