//! Binned count measurements for spectral fits.
//!
//! Purpose
//! -------
//! Hold one experiment's binned spectrum: log-energy bin centers, bin
//! half-widths, observed counts and exposures. This module validates raw
//! columns, restricts the energy range and derives flux points; likelihood
//! and null-hypothesis evaluation live in the sibling modules.
//!
//! Key behaviors
//! -------------
//! - [`Dataset::new`] checks that the four columns have equal length and
//!   finite entries, and records the data span.
//! - [`Dataset::select_energy_range`] drops bins outside a window in
//!   lockstep across all columns.
//! - [`Dataset::flux_points`] converts counts into `J` and `E³J` with error
//!   bars from a [`CountInterval`].
//!
//! Invariants & assumptions
//! ------------------------
//! - All per-bin vectors (including the prediction cache) share one length.
//! - Half-widths are in log10 energy; the four-column table stores the full
//!   width, so the reader halves and the writer doubles it.
//! - The data span is `[min(x) − hw, max(x) + hw]` using the half-widths of
//!   the extreme bins, or `(0, 0)` when empty.
//!
//! Conventions
//! -----------
//! - Energies are `log10(E/eV)`, exposures are in `m² sr s` and fluxes in
//!   `eV⁻¹ m⁻² sr⁻¹ s⁻¹`.
//! - Functions reach a dataset as [`FunctionSnapshot`] arguments; a dataset
//!   never stores the flux model or its correction.
//!
//! Testing notes
//! -------------
//! - Unit tests cover validation, range selection, the data span, exposure
//!   rescaling and flux points with and without a correction.
use crate::{
    spectrum::{
        errors::{SpecError, SpecResult},
        function::FunctionSnapshot,
    },
    statistical_tests::intervals::CountInterval,
};

/// Minimum observed count for a bin to enter the restricted likelihood.
pub const DEFAULT_RESTRICTED_MIN: f64 = 7.0;

/// Linear width of a bin centered at `log10en` with log half-width `half_width`.
///
/// `10^(x + hw) − 10^(x − hw)`.
pub fn linear_bin_size(log10en: f64, half_width: f64) -> f64 {
    10f64.powf(log10en + half_width) - 10f64.powf(log10en - half_width)
}

/// Correction factor at `x`, or 1 without a correction.
#[inline]
pub(crate) fn correction_at(correction: Option<&FunctionSnapshot<'_>>, x: f64) -> f64 {
    correction.map_or(1.0, |c| c.eval(x))
}

/// `Dataset` — one experiment's binned counts.
///
/// Fields are private so that the parallel columns cannot drift apart;
/// read them through the slice accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    title: String,
    log10en: Vec<f64>,
    half_width: Vec<f64>,
    nevents: Vec<f64>,
    exposure: Vec<f64>,
    /// Predicted counts of the last cached evaluation.
    pub(crate) nevents_fit: Vec<f64>,
    /// Bins that took part in the last null evaluation and their predictions.
    pub(crate) bins_null: Vec<usize>,
    pub(crate) nevents_null: Vec<f64>,
    log10en_min_data: f64,
    log10en_max_data: f64,
    restricted_min: f64,
}

impl Dataset {
    /// Build a dataset from bin centers, half-widths, counts and exposures.
    ///
    /// Errors
    /// ------
    /// - `SpecError::LengthMismatch` when a column differs in length from
    ///   `log10en`.
    /// - `SpecError::NonFiniteInput` for the first NaN or infinite entry.
    ///
    /// Example
    /// -------
    /// ```rust
    /// # use specfit::dataset::Dataset;
    /// let ds = Dataset::new("TA", "TA SD", vec![19.0, 19.1], vec![0.05, 0.05],
    ///                       vec![10.0, 4.0], vec![1e3, 1e3])?;
    /// assert_eq!(ds.len(), 2);
    /// assert!((ds.data_range().0 - 18.95).abs() < 1e-12);
    /// # Ok::<(), specfit::spectrum::errors::SpecError>(())
    /// ```
    pub fn new(
        name: &str, title: &str, log10en: Vec<f64>, half_width: Vec<f64>, nevents: Vec<f64>,
        exposure: Vec<f64>,
    ) -> SpecResult<Self> {
        let expected = log10en.len();
        for (column, values) in [
            ("log10en_bsize", &half_width),
            ("nevents", &nevents),
            ("exposure", &exposure),
        ] {
            if values.len() != expected {
                return Err(SpecError::LengthMismatch { column, expected, found: values.len() });
            }
        }
        for (column, values) in [
            ("log10en", &log10en),
            ("log10en_bsize", &half_width),
            ("nevents", &nevents),
            ("exposure", &exposure),
        ] {
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(SpecError::NonFiniteInput { column, index, value: values[index] });
            }
        }

        let mut ds = Dataset {
            name: name.to_string(),
            title: title.to_string(),
            nevents_fit: vec![0.0; expected],
            log10en,
            half_width,
            nevents,
            exposure,
            bins_null: Vec::new(),
            nevents_null: Vec::new(),
            log10en_min_data: 0.0,
            log10en_max_data: 0.0,
            restricted_min: DEFAULT_RESTRICTED_MIN,
        };
        ds.find_data_range();
        Ok(ds)
    }

    /// Same as [`Dataset::new`] but with full log bin sizes, as found in the
    /// four-column table.
    pub fn from_bin_sizes(
        name: &str, title: &str, log10en: Vec<f64>, bin_size: Vec<f64>, nevents: Vec<f64>,
        exposure: Vec<f64>,
    ) -> SpecResult<Self> {
        let half_width = bin_size.iter().map(|b| 0.5 * b).collect();
        Dataset::new(name, title, log10en, half_width, nevents, exposure)
    }

    // ---- Editing ----

    /// Keep only bins with `lo ≤ x ≤ hi` and recompute the data span.
    pub fn select_energy_range(&mut self, lo: f64, hi: f64) {
        let keep: Vec<bool> = self.log10en.iter().map(|&x| lo <= x && x <= hi).collect();
        let retain = |v: &mut Vec<f64>| {
            let mut it = keep.iter();
            v.retain(|_| it.next().copied().unwrap_or(false));
        };
        retain(&mut self.log10en);
        retain(&mut self.half_width);
        retain(&mut self.nevents);
        retain(&mut self.exposure);
        retain(&mut self.nevents_fit);
        self.bins_null.clear();
        self.nevents_null.clear();
        self.find_data_range();
    }

    /// Multiply every exposure by `c`.
    pub fn rescale_exposure(&mut self, c: f64) {
        self.exposure.iter_mut().for_each(|e| *e *= c);
    }

    /// Minimum observed count for the restricted likelihood.
    pub fn set_restricted_min(&mut self, n: f64) {
        self.restricted_min = n;
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    // ---- Accessors ----

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn len(&self) -> usize {
        self.log10en.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log10en.is_empty()
    }

    pub fn log10en(&self) -> &[f64] {
        &self.log10en
    }

    pub fn half_widths(&self) -> &[f64] {
        &self.half_width
    }

    pub fn nevents(&self) -> &[f64] {
        &self.nevents
    }

    pub fn exposure(&self) -> &[f64] {
        &self.exposure
    }

    /// Predicted counts stored by the last cached likelihood evaluation.
    pub fn predicted(&self) -> &[f64] {
        &self.nevents_fit
    }

    /// Bin indices used by the last null evaluation.
    pub fn null_bins(&self) -> &[usize] {
        &self.bins_null
    }

    /// Null-hypothesis predictions for [`Dataset::null_bins`].
    pub fn null_predicted(&self) -> &[f64] {
        &self.nevents_null
    }

    pub fn restricted_min(&self) -> f64 {
        self.restricted_min
    }

    /// Energy span covered by the bins, edges included.
    pub fn data_range(&self) -> (f64, f64) {
        (self.log10en_min_data, self.log10en_max_data)
    }

    /// Linear width of bin `i`.
    pub fn linear_width(&self, i: usize) -> f64 {
        linear_bin_size(self.log10en[i], self.half_width[i])
    }

    // ---- Flux points ----

    /// Counts converted to flux with per-bin error bars.
    ///
    /// With correction factor `c = corr(x)`, each bin gives the abscissa
    /// `x + log10 c`, `J = n / (c·w·A)` and `E³J = c²·10^(3x)·n / (w·A)`,
    /// with `w` the linear width and `A` the exposure. Error bars scale the
    /// interval widths of `n` by the same factor.
    pub fn flux_points(
        &self, correction: Option<&FunctionSnapshot<'_>>, interval: &dyn CountInterval,
    ) -> FluxPoints {
        let n = self.len();
        let mut points = FluxPoints::with_capacity(n);
        for i in 0..n {
            let x = self.log10en[i];
            let corr = correction_at(correction, x);
            let per_count = 1.0 / (corr * self.linear_width(i) * self.exposure[i]);
            let e3_per_count = corr * corr * 10f64.powf(3.0 * x) / (self.linear_width(i) * self.exposure[i]);
            let (lo, hi) = interval.errors(self.nevents[i]);
            points.log10en.push(x + corr.log10());
            points.j.push(per_count * self.nevents[i]);
            points.j_err_low.push(per_count * lo);
            points.j_err_high.push(per_count * hi);
            points.e3j.push(e3_per_count * self.nevents[i]);
            points.e3j_err_low.push(e3_per_count * lo);
            points.e3j_err_high.push(e3_per_count * hi);
        }
        points
    }

    // ---- Helper methods ----

    fn find_data_range(&mut self) {
        if self.log10en.is_empty() {
            self.log10en_min_data = 0.0;
            self.log10en_max_data = 0.0;
            return;
        }
        let (mut imin, mut imax) = (0, 0);
        for (i, &x) in self.log10en.iter().enumerate() {
            if x < self.log10en[imin] {
                imin = i;
            }
            if x > self.log10en[imax] {
                imax = i;
            }
        }
        self.log10en_min_data = self.log10en[imin] - self.half_width[imin];
        self.log10en_max_data = self.log10en[imax] + self.half_width[imax];
    }
}

/// Flux points derived from a dataset, in energy-corrected abscissa.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FluxPoints {
    pub log10en: Vec<f64>,
    pub j: Vec<f64>,
    pub j_err_low: Vec<f64>,
    pub j_err_high: Vec<f64>,
    pub e3j: Vec<f64>,
    pub e3j_err_low: Vec<f64>,
    pub e3j_err_high: Vec<f64>,
}

impl FluxPoints {
    fn with_capacity(n: usize) -> Self {
        FluxPoints {
            log10en: Vec::with_capacity(n),
            j: Vec::with_capacity(n),
            j_err_low: Vec::with_capacity(n),
            j_err_high: Vec::with_capacity(n),
            e3j: Vec::with_capacity(n),
            e3j_err_low: Vec::with_capacity(n),
            e3j_err_high: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.log10en.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log10en.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::{expr::Expr, function::SpecFunction};
    use crate::statistical_tests::intervals::SqrtInterval;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Column validation in `Dataset::new`.
    // - Range selection and the recomputed data span.
    // - Exposure rescaling and flux points.
    // -------------------------------------------------------------------------

    fn three_bins() -> Dataset {
        Dataset::new(
            "ds",
            "test",
            vec![18.9, 19.0, 19.1],
            vec![0.05, 0.05, 0.05],
            vec![100.0, 50.0, 0.0],
            vec![1e3, 1e3, 2e3],
        )
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Bad columns are rejected with the offending column named.
    //
    // Given
    // -----
    // - A short exposure column; a NaN count.
    //
    // Expect
    // ------
    // - `LengthMismatch { column: "exposure" }` and
    //   `NonFiniteInput { column: "nevents", index: 1 }`.
    fn new_rejects_bad_columns() {
        let err = Dataset::new("a", "", vec![19.0, 19.1], vec![0.05; 2], vec![1.0; 2], vec![1.0])
            .unwrap_err();
        assert_eq!(err, SpecError::LengthMismatch { column: "exposure", expected: 2, found: 1 });

        let err = Dataset::new("a", "", vec![19.0, 19.1], vec![0.05; 2], vec![1.0, f64::NAN], vec![1.0; 2])
            .unwrap_err();
        assert!(matches!(err, SpecError::NonFiniteInput { column: "nevents", index: 1, .. }));
    }

    #[test]
    // Purpose
    // -------
    // Range selection filters all columns together and updates the span.
    //
    // Given
    // -----
    // - Three bins at 18.9, 19.0, 19.1 with half-width 0.05; window [18.95, 19.2].
    //
    // Expect
    // ------
    // - Two bins remain with matching counts; span [18.95, 19.15].
    // - Selecting an empty window leaves span (0, 0).
    fn select_energy_range_filters_in_lockstep() {
        // Arrange
        let mut ds = three_bins();
        assert_relative_eq!(ds.data_range().0, 18.85, epsilon = 1e-12);

        // Act
        ds.select_energy_range(18.95, 19.2);

        // Assert
        assert_eq!(ds.log10en(), &[19.0, 19.1]);
        assert_eq!(ds.nevents(), &[50.0, 0.0]);
        assert_eq!(ds.exposure(), &[1e3, 2e3]);
        assert_eq!(ds.predicted().len(), 2);
        assert_relative_eq!(ds.data_range().0, 18.95, epsilon = 1e-12);
        assert_relative_eq!(ds.data_range().1, 19.15, epsilon = 1e-12);

        ds.select_energy_range(20.0, 21.0);
        assert!(ds.is_empty());
        assert_eq!(ds.data_range(), (0.0, 0.0));
    }

    #[test]
    // Purpose
    // -------
    // Flux points invert the count prediction and respect the correction.
    //
    // Given
    // -----
    // - The three-bin dataset; no correction, then a constant factor 1.1.
    //
    // Expect
    // ------
    // - J·w·A = n without correction; with correction the abscissa shifts by
    //   log10(1.1) and J shrinks by 1/1.1 while E³J grows by 1.1².
    fn flux_points_follow_correction() {
        let ds = three_bins();
        let plain = ds.flux_points(None, &SqrtInterval);
        assert_eq!(plain.len(), 3);
        assert_relative_eq!(plain.j[0] * ds.linear_width(0) * 1e3, 100.0, max_relative = 1e-12);
        assert_relative_eq!(plain.j_err_low[0] * ds.linear_width(0) * 1e3, 10.0, max_relative = 1e-12);
        assert_eq!(plain.j[2], 0.0);

        let corr = SpecFunction::new("c", Expr::Const(1.1), 17.0, 21.0);
        let snap = corr.snapshot();
        let shifted = ds.flux_points(Some(&snap), &SqrtInterval);
        assert_relative_eq!(shifted.log10en[1], 19.0 + 1.1f64.log10(), epsilon = 1e-12);
        assert_relative_eq!(shifted.j[1], plain.j[1] / 1.1, max_relative = 1e-12);
        assert_relative_eq!(shifted.e3j[1], plain.e3j[1] * 1.21, max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Exposure rescaling and full-width construction.
    //
    // Given
    // -----
    // - Bin sizes of 0.1 passed to `from_bin_sizes`; a rescale by 2.
    //
    // Expect
    // ------
    // - Half-widths of 0.05 and doubled exposures.
    fn bin_sizes_and_rescaling() {
        let mut ds =
            Dataset::from_bin_sizes("b", "", vec![19.0], vec![0.1], vec![3.0], vec![5.0]).unwrap();
        assert_relative_eq!(ds.half_widths()[0], 0.05);
        ds.rescale_exposure(2.0);
        assert_eq!(ds.exposure(), &[10.0]);
        assert_relative_eq!(
            linear_bin_size(19.0, 0.05),
            10f64.powf(19.05) - 10f64.powf(18.95),
            max_relative = 1e-15
        );
    }
}
