//! Conservative classification of mesh elements and facets
//!
//! Each element is classified per field as `NEG`, `POS`, or `IF` from its
//! nodal values.  An element **may contribute** to a descriptor if no field
//! rules it out; a cut (`IF`) element is never ruled out, since it may contain
//! pieces on either side of the interface.
//!
//! The test is an over-approximation: it never drops an element that
//! intersects the region, but it may keep some that don't.
use log::debug;

use crate::{
    Error, descriptor::Descriptor, levelset::Snapshot, marker::MarkerSet,
    mesh::Geometry, set::RegionSet, settings::Settings, tag::Tag,
};

/// How [`facets_with_neighbor_types`] combines its two marker sets
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NeighborMode {
    /// One neighbor in `a` and the other in `b`
    And,
    /// Either neighbor in `a`, or either neighbor in `b`
    Or,
}

/// Classifies elements of a mesh against a level-set snapshot
pub struct Classifier<'a, G: Geometry + ?Sized> {
    geometry: &'a G,
    snapshot: &'a Snapshot,
    settings: Settings,
}

impl<'a, G: Geometry + ?Sized> Classifier<'a, G> {
    /// Builds a new classifier
    ///
    /// The snapshot must have one nodal value per mesh vertex.
    pub fn new(
        geometry: &'a G,
        snapshot: &'a Snapshot,
        settings: Settings,
    ) -> Result<Self, Error> {
        if snapshot.vertex_count() != geometry.vertex_count() {
            return Err(Error::BadFieldLength(
                snapshot.vertex_count(),
                geometry.vertex_count(),
            ));
        }
        Ok(Self {
            geometry,
            snapshot,
            settings,
        })
    }

    /// Returns the geometry
    pub fn geometry(&self) -> &'a G {
        self.geometry
    }

    /// Returns the snapshot
    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    /// Returns the settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Classifies field `i` on element `e`
    pub fn classify_field(&self, i: usize, e: usize) -> Result<Tag, Error> {
        self.check_element(e)?;
        if i >= self.snapshot.field_count() {
            return Err(Error::BadFieldIndex(i, self.snapshot.field_count()));
        }
        Ok(self.snapshot.classify(i, self.geometry.element_vertices(e)))
    }

    /// Classifies every field on element `e`
    pub fn classify(&self, e: usize) -> Result<Vec<Tag>, Error> {
        self.check_element(e)?;
        Ok(self.snapshot.classify_all(self.geometry.element_vertices(e)))
    }

    /// Checks whether element `e` may contribute to the given descriptor
    pub fn may_contribute(
        &self,
        e: usize,
        d: &Descriptor,
    ) -> Result<bool, Error> {
        self.check_arity(d.arity())?;
        Ok(d.admits(&self.classify(e)?))
    }

    /// Marks every element that may contribute to some descriptor of `set`
    pub fn elements_with_contribution(
        &self,
        set: &RegionSet,
    ) -> Result<MarkerSet, Error> {
        self.check_arity(set.arity())?;
        let out = MarkerSet::from_predicate(
            self.geometry.element_count(),
            &self.settings,
            |e| {
                let class = self
                    .snapshot
                    .classify_all(self.geometry.element_vertices(e));
                set.iter().any(|d| d.admits(&class))
            },
        );
        debug!(
            "{} of {} elements may contribute to {set}",
            out.count(),
            out.len()
        );
        Ok(out)
    }

    /// Marks every facet that may contribute to some descriptor of `set`
    ///
    /// Facets are classified from their own vertices, which is tighter than
    /// using the neighboring elements.
    pub fn facets_with_contribution(
        &self,
        set: &RegionSet,
    ) -> Result<MarkerSet, Error> {
        self.check_arity(set.arity())?;
        Ok(MarkerSet::from_predicate(
            self.geometry.facet_count(),
            &self.settings,
            |f| {
                let class =
                    self.snapshot.classify_all(self.geometry.facet_vertices(f));
                set.iter().any(|d| d.admits(&class))
            },
        ))
    }

    fn check_element(&self, e: usize) -> Result<(), Error> {
        let n = self.geometry.element_count();
        if e >= n {
            Err(Error::BadElement(e, n))
        } else {
            Ok(())
        }
    }

    fn check_arity(&self, k: usize) -> Result<(), Error> {
        if k != self.snapshot.field_count() {
            Err(Error::ArityMismatch(k, self.snapshot.field_count()))
        } else {
            Ok(())
        }
    }
}

/// Marks facets by the membership of their neighboring elements
///
/// An interior facet between `e1` and `e2` is included if
/// - ([`NeighborMode::And`]) `e1 ∈ a ∧ e2 ∈ b`, or `e2 ∈ a ∧ e1 ∈ b`
/// - ([`NeighborMode::Or`]) `e1 ∈ a ∨ e2 ∈ b`, or `e2 ∈ a ∨ e1 ∈ b`
///
/// A boundary facet stands its single neighbor in for both sides; boundary
/// facets are skipped entirely if `include_boundary` is false.
///
/// # Panics
/// If the marker sets are not sized to the geometry's element count
pub fn facets_with_neighbor_types<G: Geometry + ?Sized>(
    geometry: &G,
    a: &MarkerSet,
    b: &MarkerSet,
    mode: NeighborMode,
    include_boundary: bool,
    settings: &Settings,
) -> Result<MarkerSet, Error> {
    let n = geometry.element_count();
    if let Some(m) = [a, b].into_iter().find(|m| m.len() != n) {
        return Err(Error::BadMarkerLength(m.len(), n));
    }

    Ok(MarkerSet::from_predicate(geometry.facet_count(), settings, |f| {
        let (e1, e2) = match geometry.facet_elements(f) {
            (e1, Some(e2)) => (e1, e2),
            (e, None) if include_boundary => (e, e),
            (_, None) => return false,
        };
        match mode {
            NeighborMode::And => {
                (a.get(e1) && b.get(e2)) || (a.get(e2) && b.get(e1))
            }
            NeighborMode::Or => a.get(e1) || a.get(e2) || b.get(e1) || b.get(e2),
        }
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::TriMesh;
    use Tag::*;
    use nalgebra::Point2;

    fn setup() -> (TriMesh, std::sync::Arc<Snapshot>) {
        let mesh =
            TriMesh::grid(4, 4, Point2::new(-1.0, -1.0), Point2::new(1.0, 1.0))
                .unwrap();
        // Vertical line at x = 0.1 and horizontal line at y = -0.1
        let f0 = mesh.interpolate(|p| p.x - 0.1);
        let f1 = mesh.interpolate(|p| p.y + 0.1);
        let snap = Snapshot::new(mesh.positions().len(), vec![f0, f1]).unwrap();
        (mesh, snap)
    }

    #[test]
    fn element_classes() {
        let (mesh, snap) = setup();
        let c = Classifier::new(&mesh, &snap, Settings::default()).unwrap();
        // Lower-left cell
        assert_eq!(c.classify(0).unwrap(), vec![Neg, Neg]);
        // Cells in column 2 (x in [0, 0.5]) are cut by field 0
        assert_eq!(c.classify_field(0, 4).unwrap(), If);
        assert_eq!(c.classify(100), Err(Error::BadElement(100, 32)));
        assert_eq!(c.classify_field(2, 0), Err(Error::BadFieldIndex(2, 2)));
    }

    #[test]
    fn contribution_is_conservative() {
        let (mesh, snap) = setup();
        let c = Classifier::new(&mesh, &snap, Settings::default()).unwrap();
        let d = Descriptor::from([Neg, Neg]);
        let m = c
            .elements_with_contribution(&RegionSet::new(d.clone()))
            .unwrap();

        // Any element with a vertex strictly inside the region must be marked
        for e in 0..mesh.element_count() {
            let inside = mesh.element_vertices(e).iter().any(|v| {
                let p = mesh.position(*v);
                p.x < 0.1 && p.y < -0.1
            });
            if inside {
                assert!(m.get(e), "element {e} was dropped");
            }
            assert_eq!(m.get(e), c.may_contribute(e, &d).unwrap());
        }
        // ...but elements entirely in the opposite quadrant are not
        assert!(!m.get(mesh.element_count() - 1));
    }

    #[test]
    fn wildcard_marks_everything() {
        let (mesh, snap) = setup();
        let c = Classifier::new(&mesh, &snap, Settings::default()).unwrap();
        let m = c.elements_with_contribution(&RegionSet::universe(2)).unwrap();
        assert_eq!(m.count(), mesh.element_count());

        let r = c.elements_with_contribution(&RegionSet::universe(3));
        assert_eq!(r, Err(Error::ArityMismatch(3, 2)));
    }

    #[test]
    fn threads_agree() {
        let (mesh, snap) = setup();
        let set = RegionSet::from_descriptors(
            2,
            [Descriptor::from([Pos, Any]), Descriptor::from([Neg, Pos])],
        )
        .unwrap();
        let serial = Classifier::new(&mesh, &snap, Settings::default())
            .unwrap()
            .elements_with_contribution(&set)
            .unwrap();
        let settings = Settings::with_threads(4).unwrap();
        let parallel = Classifier::new(&mesh, &snap, settings)
            .unwrap()
            .elements_with_contribution(&set)
            .unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn neighbor_types() {
        let mesh =
            TriMesh::grid(2, 1, Point2::new(0.0, 0.0), Point2::new(2.0, 1.0))
                .unwrap();
        // Triangles 0, 1 in the left cell; 2, 3 in the right cell.  Triangles
        // 0 and 3 share the vertical edge between the cells.
        let mut a = MarkerSet::new(4);
        let mut b = MarkerSet::new(4);
        a.set(0, true);
        b.set(3, true);
        let s = Settings::default();

        let and = facets_with_neighbor_types(
            &mesh,
            &a,
            &b,
            NeighborMode::And,
            true,
            &s,
        )
        .unwrap();
        // Only the shared vertical edge
        assert_eq!(and.count(), 1);
        let f = and.iter().next().unwrap();
        assert_eq!(mesh.facet(f).vertices, [1, 4]);

        let or = facets_with_neighbor_types(
            &mesh,
            &a,
            &b,
            NeighborMode::Or,
            false,
            &s,
        )
        .unwrap();
        // Interior facets touching triangle 0 or 3: the two diagonals and the
        // shared edge
        assert_eq!(or.count(), 3);
        assert!(and.is_subset(&or));

        let or_bnd = facets_with_neighbor_types(
            &mesh,
            &a,
            &b,
            NeighborMode::Or,
            true,
            &s,
        )
        .unwrap();
        // ...plus the boundary edges of triangles 0 and 3
        assert_eq!(or_bnd.count(), 5);
    }

    #[test]
    fn neighbor_types_sizes() {
        let mesh =
            TriMesh::grid(2, 1, Point2::new(0.0, 0.0), Point2::new(2.0, 1.0))
                .unwrap();
        let s = Settings::default();
        let good = MarkerSet::new(4);
        let short = MarkerSet::new(3);
        for (a, b) in [(&short, &good), (&good, &short)] {
            let r = facets_with_neighbor_types(
                &mesh,
                a,
                b,
                NeighborMode::And,
                false,
                &s,
            );
            assert_eq!(r, Err(Error::BadMarkerLength(3, 4)));
        }
    }
}
