//! Level-set families and immutable snapshots of their nodal values
//!
//! A [`LevelSets`] object owns the piecewise-linear (nodal) values of `k`
//! fields.  Algebra and classification never read it directly; instead they
//! work on a [`Snapshot`], which is an immutable copy tagged with the family's
//! generation at the time it was taken.  Updating a field bumps the
//! generation, which marks every older snapshot as stale:
//! ```
//! use mlset::LevelSets;
//!
//! let mut ls = LevelSets::new(3, vec![vec![-1.0, 0.5, 2.0]])?;
//! let snap = ls.snapshot();
//! assert!(!snap.is_stale());
//!
//! ls.set_field(0, vec![1.0, 1.0, 1.0])?;
//! assert!(snap.is_stale());
//! assert!(!ls.snapshot().is_stale());
//! # Ok::<(), mlset::Error>(())
//! ```
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{Error, tag::Tag};

/// Mutable owner of a family of piecewise-linear level-set fields
#[derive(Debug)]
pub struct LevelSets {
    vertex_count: usize,
    fields: Vec<Arc<[f64]>>,
    generation: Arc<AtomicU64>,
}

impl LevelSets {
    /// Builds a new family from per-field nodal values
    ///
    /// Every field must have exactly `vertex_count` values.
    pub fn new(
        vertex_count: usize,
        fields: Vec<Vec<f64>>,
    ) -> Result<Self, Error> {
        if fields.is_empty() {
            return Err(Error::EmptyFamily);
        }
        let fields = fields
            .into_iter()
            .map(|f| {
                if f.len() != vertex_count {
                    Err(Error::BadFieldLength(f.len(), vertex_count))
                } else {
                    Ok(f.into())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            vertex_count,
            fields,
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Returns the number of fields in the family
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the number of nodal values per field
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Returns the current generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Returns the nodal values of field `i`
    pub fn field(&self, i: usize) -> Result<&[f64], Error> {
        self.fields
            .get(i)
            .map(|f| &f[..])
            .ok_or(Error::BadFieldIndex(i, self.fields.len()))
    }

    /// Replaces the nodal values of field `i`, invalidating older snapshots
    pub fn set_field(
        &mut self,
        i: usize,
        values: Vec<f64>,
    ) -> Result<(), Error> {
        let n = self.fields.len();
        if values.len() != self.vertex_count {
            return Err(Error::BadFieldLength(values.len(), self.vertex_count));
        }
        let slot = self.fields.get_mut(i).ok_or(Error::BadFieldIndex(i, n))?;
        *slot = values.into();
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Takes an immutable snapshot of the current nodal values
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::new(Snapshot {
            vertex_count: self.vertex_count,
            fields: self.fields.clone(),
            generation: self.generation(),
            live: Some(self.generation.clone()),
        })
    }
}

/// Immutable copy of a level-set family's nodal values
#[derive(Debug)]
pub struct Snapshot {
    vertex_count: usize,
    fields: Vec<Arc<[f64]>>,
    generation: u64,

    /// Generation counter of the owning family, if any
    live: Option<Arc<AtomicU64>>,
}

impl Snapshot {
    /// Builds a free-standing snapshot, which never goes stale
    pub fn new(
        vertex_count: usize,
        fields: Vec<Vec<f64>>,
    ) -> Result<Arc<Self>, Error> {
        let ls = LevelSets::new(vertex_count, fields)?;
        Ok(Arc::new(Self {
            vertex_count,
            fields: ls.fields,
            generation: 0,
            live: None,
        }))
    }

    /// Returns the number of fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the number of nodal values per field
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Returns the generation at which this snapshot was taken
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the nodal values of field `i`
    ///
    /// # Panics
    /// If `i` is out of range
    pub fn field(&self, i: usize) -> &[f64] {
        &self.fields[i]
    }

    /// Returns the value of every field at vertex `v`
    pub fn values_at(&self, v: usize) -> Vec<f64> {
        self.fields.iter().map(|f| f[v]).collect()
    }

    /// Classifies field `i` on a set of vertices (e.g. one element)
    pub fn classify(&self, i: usize, vertices: &[usize]) -> Tag {
        let f = &self.fields[i];
        Tag::of_nodal_values(vertices.iter().map(|v| f[*v]))
    }

    /// Classifies every field on a set of vertices
    pub fn classify_all(&self, vertices: &[usize]) -> Vec<Tag> {
        (0..self.fields.len())
            .map(|i| self.classify(i, vertices))
            .collect()
    }

    /// Checks whether the owning family has been updated since this snapshot
    pub fn is_stale(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|g| g.load(Ordering::Acquire) != self.generation)
    }

    /// Returns [`Error::StaleCompressionContext`] if this snapshot is stale
    pub fn check_fresh(&self) -> Result<(), Error> {
        match &self.live {
            Some(g) => {
                let current = g.load(Ordering::Acquire);
                if current != self.generation {
                    Err(Error::StaleCompressionContext(
                        self.generation,
                        current,
                    ))
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }
}
