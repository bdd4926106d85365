//! `mlset` is a library for describing regions bounded by several level-set
//! fields at once, and for deciding which mesh elements carry those regions.
//!
//! A **level-set field** is a scalar function `φ(x)` sampled at the vertices
//! of a mesh.  By convention, the field is **negative** inside its shape,
//! **non-negative** outside, and its zero set is the shape's **interface**.
//! With `k` fields, a point is described by one [`Tag`] per field, and a
//! region is described by a [`Descriptor`] (a tuple of tags) or a
//! [`RegionSet`] (a union of descriptors).
//!
//! # Region algebra
//! Regions are combined symbolically, without looking at any field values:
//! ```
//! use mlset::{Descriptor, RegionSet, Tag::*};
//!
//! // Inside all three fields
//! let domain = RegionSet::new(Descriptor::from([Neg, Neg, Neg]));
//!
//! // The boundary has one piece per field
//! let boundary = domain.boundary()?;
//! assert_eq!(boundary.len(), 3);
//! assert_eq!(boundary.codim(), Some(1));
//!
//! // Everything outside the domain
//! let outside = domain.complement()?;
//! assert!(domain.intersect(&outside)?.is_empty());
//! # Ok::<(), mlset::Error>(())
//! ```
//!
//! The wildcard tag [`Tag::Any`] leaves a field unconstrained; an interface
//! tag [`Tag::If`] restricts a region to a field's zero set, raising its
//! codimension.  All descriptors within a set share one codimension.
//!
//! # Classification
//! Given a mesh (anything implementing [`mesh::Geometry`]) and a [`Snapshot`]
//! of nodal values, the [`classify::Classifier`] marks the elements which may
//! contribute to a region.  The test is conservative: an element cut by a
//! field's interface is never ruled out by that field.
//! ```
//! use mlset::{
//!     Descriptor, RegionSet, Settings, Snapshot, Tag::*,
//!     classify::Classifier, mesh::{Geometry, TriMesh},
//! };
//! use nalgebra::Point2;
//!
//! let mesh = TriMesh::grid(4, 4, Point2::new(-1.0, -1.0), Point2::new(1.0, 1.0))?;
//! let snap = Snapshot::new(
//!     mesh.vertex_count(),
//!     vec![mesh.interpolate(|p| p.coords.norm() - 0.6)], // circle
//! )?;
//! let c = Classifier::new(&mesh, &snap, Settings::default())?;
//!
//! let inside = c.elements_with_contribution(
//!     &RegionSet::new(Descriptor::from([Neg])),
//! )?;
//! assert!(inside.count() > 0);
//! assert!(inside.count() < mesh.element_count());
//! # Ok::<(), mlset::Error>(())
//! ```
//!
//! Facets are marked the same way, or by the membership of their neighbors
//! with [`classify::facets_with_neighbor_types`]; the
//! [`active::ActiveSetBuilder`] uses the latter to find ghost-penalty facets.
//!
//! # Compression
//! The symbolic algebra cannot tell that `x < 0.3 ∧ x > 0.6` is empty.
//! [`RegionSet::compress`] asks a [`quadrature::CutQuadrature`] provider for
//! the measure of each descriptor, and drops those that are (numerically)
//! empty; see the [`oracle`] module for details.  A compression context may
//! be bound persistently, in which case every derived set is compressed
//! automatically.
//!
//! Snapshots are immutable.  Updating a [`LevelSets`] family invalidates its
//! older snapshots, and compressing against a stale snapshot fails with
//! [`Error::StaleCompressionContext`].
//!
//! # Feature flags
#![doc = document_features::document_features!()]
#![warn(missing_docs)]

pub mod active;
pub mod classify;
pub mod descriptor;
pub mod levelset;
pub mod marker;
pub mod mesh;
pub mod oracle;
pub mod quadrature;
pub mod set;
pub mod tag;

mod error;
mod settings;

pub use descriptor::Descriptor;
pub use error::Error;
pub use levelset::{LevelSets, Snapshot};
pub use marker::MarkerSet;
pub use set::RegionSet;
pub use settings::{Settings, ThreadPool};
pub use tag::Tag;
