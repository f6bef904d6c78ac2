//! In-place preprocessing chains.
//!
//! A [`PreprocessingPipeline`] applies its filters in insertion order to any
//! [`SignalBlock`], so the same chain serves whole recordings and single
//! epochs. Concrete filters (band-pass, notch, re-referencing) are supplied
//! by the caller; any `FnMut(&mut dyn SignalBlock)` closure qualifies.

use rootstar_erp_core::SignalBlock;

/// A signal transformation applied in place.
pub trait Filter {
    /// Transform the block's signals in place.
    fn apply(&mut self, block: &mut dyn SignalBlock);
}

impl<F> Filter for F
where
    F: FnMut(&mut dyn SignalBlock),
{
    fn apply(&mut self, block: &mut dyn SignalBlock) {
        self(block);
    }
}

/// Ordered chain of filters.
#[derive(Default)]
pub struct PreprocessingPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl PreprocessingPipeline {
    /// Create an empty pipeline (identity transform).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter.
    pub fn add_filter(&mut self, filter: impl Filter + 'static) {
        self.filters.push(Box::new(filter));
    }

    /// Append a filter, builder style.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.add_filter(filter);
        self
    }

    /// Run every filter over the block.
    pub fn apply(&mut self, block: &mut dyn SignalBlock) {
        for filter in &mut self.filters {
            filter.apply(block);
        }
    }

    /// Number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the pipeline has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl std::fmt::Debug for PreprocessingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreprocessingPipeline")
            .field("filters", &self.filters.len())
            .finish()
    }
}
