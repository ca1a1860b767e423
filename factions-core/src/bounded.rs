use serde::{Deserialize, Serialize};

/// A value clamped to an integer range.
/// Used for: player power (0 to the configured ceiling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundedInt {
    value: i32,
    min: i32,
    max: i32,
}

impl BoundedInt {
    pub const fn new(value: i32, min: i32, max: i32) -> Self {
        // An inverted range collapses onto `min`.
        let max = if max < min { min } else { max };
        let value = if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        };
        Self { value, min, max }
    }

    pub fn get(&self) -> i32 {
        self.value
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn is_at_max(&self) -> bool {
        self.value >= self.max
    }

    pub fn add(&mut self, delta: i32) {
        self.value = self.value.saturating_add(delta).clamp(self.min, self.max);
    }

    pub fn set(&mut self, value: i32) {
        self.value = value.clamp(self.min, self.max);
    }

    /// Replace the bounds, re-clamping the current value.
    pub fn rebound(&mut self, min: i32, max: i32) {
        *self = Self::new(self.value, min, max);
    }
}

/// Power starts at `initial` and never leaves `0..=max`.
pub const fn new_power(initial: i32, max: i32) -> BoundedInt {
    BoundedInt::new(initial, 0, max)
}
