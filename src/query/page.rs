/// Row caps applied regardless of what the caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    default: usize,
    max: usize,
}

impl PageLimits {
    pub fn new(default: usize, max: usize) -> Self {
        let max = max.max(1);
        Self {
            default: default.clamp(1, max),
            max,
        }
    }

    /// `None` or zero means the default; anything above the ceiling is cut to it.
    pub fn clamp(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|n| *n > 0)
            .unwrap_or(self.default)
            .min(self.max)
    }

    pub fn max(&self) -> usize {
        self.max
    }
}
