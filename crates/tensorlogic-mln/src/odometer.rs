//! Mixed-radix counter shared by partition enumeration and top-k combination.

/// Lazily yields every index vector `v` with `v[i] < bounds[i]`.
///
/// Digit 0 is least significant: it advances first and carries into digit 1
/// on overflow. Iteration ends when a carry propagates past the last digit.
/// With no digits exactly one (empty) state is produced; with any zero bound
/// nothing is produced.
#[derive(Clone, Debug)]
pub struct Odometer {
    bounds: Vec<usize>,
    next_state: Option<Vec<usize>>,
}

impl Odometer {
    /// Create a counter over the given per-digit bounds.
    pub fn new(bounds: Vec<usize>) -> Self {
        let next_state = if bounds.contains(&0) {
            None
        } else {
            Some(vec![0; bounds.len()])
        };
        Self { bounds, next_state }
    }

    /// Counter over `digits` binary digits.
    pub fn binary(digits: usize) -> Self {
        Self::new(vec![2; digits])
    }

    /// Per-digit bounds.
    pub fn bounds(&self) -> &[usize] {
        &self.bounds
    }

    /// Total number of states, or `None` on overflow.
    pub fn total_states(&self) -> Option<usize> {
        self.bounds
            .iter()
            .try_fold(1usize, |acc, &b| acc.checked_mul(b))
    }

    /// Increment with carry; returns `false` once the counter wraps around.
    fn increment(state: &mut [usize], bounds: &[usize]) -> bool {
        for (digit, &bound) in state.iter_mut().zip(bounds) {
            *digit += 1;
            if *digit < bound {
                return true;
            }
            *digit = 0;
        }
        false
    }
}

impl Iterator for Odometer {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next_state.take()?;
        let mut following = current.clone();
        if Self::increment(&mut following, &self.bounds) {
            self.next_state = Some(following);
        }
        Some(current)
    }
}
