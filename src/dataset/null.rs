//! Expected vs observed counts under a null-hypothesis flux.
use std::ops::AddAssign;

use crate::{
    dataset::data::{Dataset, correction_at},
    spectrum::function::FunctionSnapshot,
};

/// Summed null-hypothesis prediction and observed counts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NullCounts {
    pub expected: f64,
    pub observed: f64,
}

impl AddAssign for NullCounts {
    fn add_assign(&mut self, rhs: NullCounts) {
        self.expected += rhs.expected;
        self.observed += rhs.observed;
    }
}

impl Dataset {
    /// Count expected and observed events inside the null function's domain.
    ///
    /// The domain edges are moved into this dataset's energy scale
    /// (`edge + log10 corr(edge)`) and bins with centers inside the shifted
    /// domain take part. Their indices and null predictions are cached.
    /// Without a null function the cache is cleared and `(0, 0)` returned.
    pub fn eval_null(
        &mut self, null: Option<&FunctionSnapshot<'_>>, correction: Option<&FunctionSnapshot<'_>>,
    ) -> NullCounts {
        self.bins_null.clear();
        self.nevents_null.clear();
        let Some(null) = null else {
            return NullCounts::default();
        };

        let lo = null.xmin + correction_at(correction, null.xmin).log10();
        let hi = null.xmax + correction_at(correction, null.xmax).log10();
        let mut counts = NullCounts::default();
        for i in 0..self.len() {
            let x = self.log10en()[i];
            if x < lo || x > hi {
                continue;
            }
            let expected = self.predict_bin(i, null, correction);
            self.bins_null.push(i);
            self.nevents_null.push(expected);
            counts.expected += expected;
            counts.observed += self.nevents()[i];
        }
        counts
    }
}
