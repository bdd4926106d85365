//! Active sets, ghost-penalty facets, and outward normals
//!
//! An unfitted finite-element assembly needs to know which elements and facets
//! carry degrees of freedom for a region, which facets need stabilization, and
//! which way the region's boundary faces.  [`ActiveSetBuilder`] answers the
//! first two from a [`Classifier`]; [`outward_normals`] answers the last one
//! symbolically, from the region's descriptors alone.
use std::collections::BTreeMap;

use log::debug;
use nalgebra::Vector2;

use crate::{
    Error,
    classify::{Classifier, NeighborMode, facets_with_neighbor_types},
    descriptor::Descriptor,
    levelset::Snapshot,
    marker::MarkerSet,
    mesh::{Geometry, TriMesh},
    set::RegionSet,
    settings::Settings,
    tag::Tag,
};

/// Builds element and facet marker sets for region sets
pub struct ActiveSetBuilder<'a, G: Geometry + ?Sized> {
    classifier: Classifier<'a, G>,
}

impl<'a, G: Geometry + ?Sized> ActiveSetBuilder<'a, G> {
    /// Builds a new active-set builder
    pub fn new(
        geometry: &'a G,
        snapshot: &'a Snapshot,
        settings: Settings,
    ) -> Result<Self, Error> {
        Ok(Self {
            classifier: Classifier::new(geometry, snapshot, settings)?,
        })
    }

    /// Returns the underlying classifier
    pub fn classifier(&self) -> &Classifier<'a, G> {
        &self.classifier
    }

    /// Marks the elements that may carry part of `set`
    pub fn elements(&self, set: &RegionSet) -> Result<MarkerSet, Error> {
        self.classifier.elements_with_contribution(set)
    }

    /// Marks the facets that may carry part of `set`
    pub fn facets(&self, set: &RegionSet) -> Result<MarkerSet, Error> {
        self.classifier.facets_with_contribution(set)
    }

    /// Marks the elements cut by the boundary of `set`
    pub fn cut_elements(&self, set: &RegionSet) -> Result<MarkerSet, Error> {
        self.classifier.elements_with_contribution(&set.boundary()?)
    }

    /// Marks the interior facets that need ghost-penalty stabilization
    ///
    /// These are facets where one neighbor is cut by the boundary of `set` and
    /// the other is active for `set`.
    pub fn ghost_penalty_facets(
        &self,
        set: &RegionSet,
    ) -> Result<MarkerSet, Error> {
        let active = self.elements(set)?;
        let cut = self.cut_elements(set)?;
        let out = facets_with_neighbor_types(
            self.classifier.geometry(),
            &cut,
            &active,
            NeighborMode::And,
            false,
            self.classifier.settings(),
        )?;
        debug!(
            "{} ghost-penalty facets ({} cut elements, {} active)",
            out.count(),
            cut.count(),
            active.count()
        );
        Ok(out)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Outward normal of one boundary piece, as a function of a single field
///
/// The normal is the normalized gradient of field [`NormalField::field`],
/// flipped so that it points away from the side given by
/// [`NormalField::inside`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NormalField {
    /// Index of the field whose zero set carries the piece
    pub field: usize,
    /// Tag of the parent domain at [`NormalField::field`] (`NEG` or `POS`)
    pub inside: Tag,
}

impl NormalField {
    /// Converts a field gradient into an outward unit normal
    ///
    /// Returns `None` if the gradient vanishes.
    pub fn direction(&self, grad: Vector2<f64>) -> Option<Vector2<f64>> {
        let n = grad.try_normalize(0.0)?;
        Some(if self.inside == Tag::Pos { -n } else { n })
    }

    /// Evaluates the normal on element `e` of a P1 mesh
    ///
    /// Returns `None` if the snapshot does not fit the mesh, or if `e` or
    /// the field index is out of range.
    pub fn at(
        &self,
        mesh: &TriMesh,
        snapshot: &Snapshot,
        e: usize,
    ) -> Option<Vector2<f64>> {
        if self.field >= snapshot.field_count()
            || snapshot.vertex_count() != mesh.vertex_count()
            || e >= mesh.element_count()
        {
            return None;
        }
        let g = mesh.gradient(e, snapshot.field(self.field))?;
        self.direction(g)
    }
}

/// Maps each piece of `boundary` onto its outward normal relative to `domain`
///
/// Every piece must have exactly one `IF` tag, at some field `j`; its parents
/// are the descriptors of `domain` which agree with it everywhere except at
/// `j`, where they are signed.  If every parent is `NEG` at `j`, the normal
/// follows the gradient of field `j`; if every parent is `POS`, it opposes it.
///
/// Pieces with parents on both sides (interfaces between two parts of the
/// domain) or with no signed parent are not part of the outer boundary, and
/// are left out of the map.
pub fn outward_normals(
    domain: &RegionSet,
    boundary: &RegionSet,
) -> Result<BTreeMap<Descriptor, NormalField>, Error> {
    if domain.arity() != boundary.arity() {
        return Err(Error::ArityMismatch(domain.arity(), boundary.arity()));
    }
    let mut out = BTreeMap::new();
    for piece in boundary {
        let mut interfaces = piece.interfaces();
        let (Some(j), None) = (interfaces.next(), interfaces.next()) else {
            return Err(Error::AmbiguousBoundaryPiece(piece.clone()));
        };

        let (mut neg, mut pos) = (false, false);
        for parent in domain {
            let agrees = (0..piece.arity())
                .filter(|k| *k != j)
                .all(|k| parent[k] == piece[k]);
            if agrees {
                match parent[j] {
                    Tag::Neg => neg = true,
                    Tag::Pos => pos = true,
                    Tag::If | Tag::Any => (),
                }
            }
        }
        let inside = match (neg, pos) {
            (true, false) => Tag::Neg,
            (false, true) => Tag::Pos,
            _ => {
                debug!("{piece} is not on the outer boundary");
                continue;
            }
        };
        out.insert(piece.clone(), NormalField { field: j, inside });
    }
    Ok(out)
}

/// Computes the outward normals of `domain`'s own boundary
pub fn boundary_normals(
    domain: &RegionSet,
) -> Result<BTreeMap<Descriptor, NormalField>, Error> {
    outward_normals(domain, &domain.boundary()?)
}
