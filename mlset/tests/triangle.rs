use std::sync::Arc;

use approx::assert_relative_eq;
use mlset::{
    Descriptor, Error, LevelSets, MarkerSet, RegionSet, Settings, Snapshot,
    Tag::*,
    active::{ActiveSetBuilder, boundary_normals},
    classify::Classifier,
    mesh::{Geometry, TriMesh},
    oracle::CompressionContext,
    quadrature::ClipQuadrature,
};
use nalgebra::{Point2, Vector2};

/// Mesh and level sets bounding the triangle `(0,0), (1,0), (0,1)`
fn triangle(n: usize) -> (Arc<TriMesh>, LevelSets) {
    let mesh = Arc::new(
        TriMesh::grid(n, n, Point2::new(-0.5, -0.5), Point2::new(1.5, 1.5))
            .unwrap(),
    );
    let ls = LevelSets::new(
        mesh.vertex_count(),
        vec![
            mesh.interpolate(|p| -p.x),
            mesh.interpolate(|p| -p.y),
            mesh.interpolate(|p| p.x + p.y - 1.0),
        ],
    )
    .unwrap();
    (mesh, ls)
}

fn context(mesh: &Arc<TriMesh>, snap: Arc<Snapshot>) -> Arc<CompressionContext> {
    CompressionContext::new(
        snap,
        Arc::new(ClipQuadrature::new(mesh.clone())),
        Settings::default(),
    )
}

#[test]
fn triangle_scenario() {
    let (mesh, ls) = triangle(16);
    let ctx = context(&mesh, ls.snapshot());

    let mut domain = RegionSet::new(Descriptor::from([Neg, Neg, Neg]));
    assert_eq!(domain.compress(&ctx, true).unwrap(), 0);

    let boundary = domain.boundary().unwrap();
    assert_eq!(boundary.len(), 3);
    assert!(boundary.context().is_some());
    for d in &boundary {
        assert_eq!(d.interfaces().count(), 1);
    }
    let perimeter: f64 = boundary.iter().map(|d| ctx.measure(d).unwrap()).sum();
    assert_relative_eq!(perimeter, 2.0 + 2f64.sqrt(), epsilon = 1e-12);

    let corners = boundary.boundary().unwrap();
    assert_eq!(corners.len(), 3);
    assert_eq!(corners.codim(), Some(2));

    // Everything else, minus the impossible x < 0, y < 0, x + y > 1
    let outside = domain.complement().unwrap();
    let mut expanded = outside.expand_wildcards();
    let dropped = expanded.compress(&ctx, false).unwrap();
    assert_eq!(dropped, 1);
    assert_eq!(expanded.len(), 6);
}

#[test]
fn marker_monotonicity() {
    let (mesh, ls) = triangle(12);
    let snap = ls.snapshot();
    let c = Classifier::new(&*mesh, &snap, Settings::default()).unwrap();

    let small = RegionSet::new(Descriptor::from([Neg, Neg, Neg]));
    let large = RegionSet::from_descriptors(
        3,
        [Descriptor::from([Neg, Neg, Neg]), Descriptor::from([Pos, Neg, Any])],
    )
    .unwrap();
    assert!(small.is_subset(&large));

    let m_small = c.elements_with_contribution(&small).unwrap();
    let m_large = c.elements_with_contribution(&large).unwrap();
    assert!(m_small.is_subset(&m_large));

    let f_small = c.facets_with_contribution(&small).unwrap();
    let f_large = c.facets_with_contribution(&large).unwrap();
    assert!(f_small.is_subset(&f_large));

    let everything = c.elements_with_contribution(&RegionSet::universe(3));
    assert_eq!(everything.unwrap(), MarkerSet::full(mesh.element_count()));
}

#[test]
fn active_sets_cover_quadrature() {
    let (mesh, ls) = triangle(12);
    let snap = ls.snapshot();
    let builder =
        ActiveSetBuilder::new(&*mesh, &snap, Settings::default()).unwrap();
    let domain = RegionSet::new(Descriptor::from([Neg, Neg, Neg]));
    let active = builder.elements(&domain).unwrap();

    // Every element with positive area inside the triangle is active
    for e in 0..mesh.element_count() {
        let [a, b, c] = mesh.corners(e);
        let centroid = Point2::from((a.coords + b.coords + c.coords) / 3.0);
        let inside = centroid.x > 0.0
            && centroid.y > 0.0
            && centroid.x + centroid.y < 1.0;
        if inside {
            assert!(active.get(e), "element {e} should be active");
        }
    }

    let ghost = builder.ghost_penalty_facets(&domain).unwrap();
    let cut = builder.cut_elements(&domain).unwrap();
    for f in ghost.iter() {
        let (e1, e2) = mesh.facet_elements(f);
        let e2 = e2.expect("ghost-penalty facets are interior");
        assert!(cut.get(e1) || cut.get(e2));
    }
}

#[test]
fn outward_normals_point_away() {
    let (mesh, ls) = triangle(8);
    let snap = ls.snapshot();
    let domain = RegionSet::new(Descriptor::from([Neg, Neg, Neg]));
    let normals = boundary_normals(&domain).unwrap();
    assert_eq!(normals.len(), 3);

    let centroid = Point2::new(1.0 / 3.0, 1.0 / 3.0);
    let midpoints = [
        ([If, Neg, Neg], Point2::new(0.0, 0.5)),
        ([Neg, If, Neg], Point2::new(0.5, 0.0)),
        ([Neg, Neg, If], Point2::new(0.5, 0.5)),
    ];
    for (d, mid) in midpoints {
        let n = normals[&Descriptor::from(d)].at(&mesh, &snap, 0).unwrap();
        assert!(n.dot(&(mid - centroid)) > 0.0, "{n:?} points inwards");
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
    }

    let n = normals[&Descriptor::from([Neg, If, Neg])];
    assert_relative_eq!(
        n.direction(Vector2::new(0.0, -2.0)).unwrap(),
        Vector2::new(0.0, -1.0)
    );
}

#[test]
fn updates_invalidate_contexts() {
    let (mesh, mut ls) = triangle(8);
    let mut domain = RegionSet::new(Descriptor::from([Neg, Neg, Neg]));
    domain.compress(&context(&mesh, ls.snapshot()), true).unwrap();

    // Shrink the triangle
    ls.set_field(2, mesh.interpolate(|p| p.x + p.y - 0.5)).unwrap();
    assert_eq!(
        domain.boundary(),
        Err(Error::StaleCompressionContext(0, 1))
    );

    domain.rebind(context(&mesh, ls.snapshot())).unwrap();
    let boundary = domain.boundary().unwrap();
    let ctx = boundary.context().unwrap();
    let perimeter: f64 = boundary.iter().map(|d| ctx.measure(d).unwrap()).sum();
    assert_relative_eq!(perimeter, 1.0 + 0.5f64.sqrt(), epsilon = 1e-12);
}
