//! Realizability queries and compression of region sets
//!
//! The symbolic algebra happily produces descriptors that are empty for a
//! particular family of fields, e.g. `x < 0.3 ∧ x > 0.6`.  A
//! [`CompressionContext`] pairs a [`Snapshot`] with a [`CutQuadrature`]
//! provider, and [`RegionSet::compress`] uses it to drop every descriptor whose
//! measure falls below [`Settings::tolerance`]:
//! ```
//! use std::sync::Arc;
//! use mlset::{
//!     Descriptor, RegionSet, Settings, Snapshot, Tag::*,
//!     mesh::TriMesh, oracle::CompressionContext, quadrature::ClipQuadrature,
//! };
//! use nalgebra::Point2;
//!
//! let mesh = Arc::new(TriMesh::grid(
//!     5, 5, Point2::new(0.0, 0.0), Point2::new(1.0, 1.0),
//! )?);
//! let snap = Snapshot::new(
//!     mesh.positions().len(),
//!     vec![
//!         mesh.interpolate(|p| p.x - 0.3),
//!         mesh.interpolate(|p| 0.6 - p.x),
//!     ],
//! )?;
//! let ctx = CompressionContext::new(
//!     snap,
//!     Arc::new(ClipQuadrature::new(mesh)),
//!     Settings::default(),
//! );
//!
//! let mut s = RegionSet::from_descriptors(2, [
//!     Descriptor::from([Neg, Neg]), // impossible
//!     Descriptor::from([Neg, Pos]),
//! ])?;
//! assert_eq!(s.compress(&ctx, false)?, 1);
//! assert_eq!(s, RegionSet::new(Descriptor::from([Neg, Pos])));
//! # Ok::<(), mlset::Error>(())
//! ```
use std::sync::Arc;

use log::{debug, trace};

use crate::{
    Error, descriptor::Descriptor, levelset::Snapshot,
    quadrature::CutQuadrature, set::RegionSet, settings::Settings,
};

/// Snapshot and cut-quadrature provider used to prune region sets
pub struct CompressionContext {
    snapshot: Arc<Snapshot>,
    provider: Arc<dyn CutQuadrature>,
    settings: Settings,
}

impl std::fmt::Debug for CompressionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionContext")
            .field("generation", &self.snapshot.generation())
            .field("fields", &self.snapshot.field_count())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CompressionContext {
    /// Builds a new shared context
    pub fn new(
        snapshot: Arc<Snapshot>,
        provider: Arc<dyn CutQuadrature>,
        settings: Settings,
    ) -> Arc<Self> {
        Arc::new(Self {
            snapshot,
            provider,
            settings,
        })
    }

    /// Returns the snapshot against which sets are compressed
    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    /// Returns the settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Measures the region described by `d`
    ///
    /// Wildcards are expanded and the weights of every concrete piece's
    /// quadrature rule are summed.
    pub fn measure(&self, d: &Descriptor) -> Result<f64, Error> {
        if d.arity() != self.snapshot.field_count() {
            return Err(Error::ArityMismatch(
                d.arity(),
                self.snapshot.field_count(),
            ));
        }
        let mut total = 0.0;
        for piece in d.expand_wildcards() {
            if let Some(rule) =
                self.provider
                    .rule(&self.snapshot, &piece, self.settings.order)?
            {
                total += rule.measure();
            }
        }
        Ok(total)
    }

    /// Checks whether `d` has a measure of at least [`Settings::tolerance`]
    pub fn is_realizable(&self, d: &Descriptor) -> Result<bool, Error> {
        Ok(self.measure(d)? >= self.settings.tolerance)
    }

    /// Drops unrealizable descriptors from `set`, returning how many
    ///
    /// Every query is answered before `set` is modified, so an error leaves it
    /// untouched.
    pub(crate) fn compress(&self, set: &mut RegionSet) -> Result<usize, Error> {
        self.snapshot.check_fresh()?;
        if set.arity() != self.snapshot.field_count() {
            return Err(Error::ArityMismatch(
                set.arity(),
                self.snapshot.field_count(),
            ));
        }

        let ds: Vec<&Descriptor> = set.iter().collect();
        let keep = self
            .settings
            .map_indices(ds.len(), |i| self.is_realizable(ds[i]))
            .into_iter()
            .collect::<Result<Vec<bool>, Error>>()?;
        for (d, k) in ds.iter().zip(&keep) {
            if !k {
                trace!("discarding unrealizable descriptor {d}");
            }
        }

        let before = set.len();
        // `retain` visits descriptors in the same (ascending) order as `iter`
        let mut flags = keep.into_iter();
        set.retain(|_| flags.next().unwrap_or(true));
        let dropped = before - set.len();
        debug!("compressed {before} descriptors to {}", set.len());
        Ok(dropped)
    }
}

impl RegionSet {
    /// Discards every descriptor that is empty under the given context
    ///
    /// Returns the number of discarded descriptors.  If `persistent` is true,
    /// the context is bound to this set, and every set derived from it is
    /// compressed against the same context before being returned.
    ///
    /// Compression is idempotent.  If the provider fails, the set is left
    /// unchanged.
    pub fn compress(
        &mut self,
        context: &Arc<CompressionContext>,
        persistent: bool,
    ) -> Result<usize, Error> {
        let n = context.compress(self)?;
        if persistent {
            self.set_context(context.clone());
        }
        Ok(n)
    }
}
