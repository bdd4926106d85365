//! Mesh topology and a reference triangle mesh
//!
//! Classification only needs topology (which vertices belong to an element,
//! which elements share a facet); that is captured by the [`Geometry`] trait.
//! [`TriMesh`] is a planar triangle mesh implementing it, which also provides
//! the vertex positions used by normals and quadrature.
use std::collections::HashMap;

use nalgebra::{Matrix2, Point2, Vector2};

use crate::Error;

/// Mesh provider consumed by the discrete classifier
///
/// Elements and facets are identified by dense indices in `0..count`.
pub trait Geometry: Sync {
    /// Returns the number of mesh vertices
    fn vertex_count(&self) -> usize;

    /// Returns the number of elements
    fn element_count(&self) -> usize;

    /// Returns the vertex indices of element `e`
    ///
    /// # Panics
    /// If `e` is out of range
    fn element_vertices(&self, e: usize) -> &[usize];

    /// Returns the number of facets
    fn facet_count(&self) -> usize;

    /// Returns the vertex indices of facet `f`
    fn facet_vertices(&self, f: usize) -> &[usize];

    /// Returns the element(s) adjacent to facet `f`
    ///
    /// Boundary facets have a single neighbor.
    fn facet_elements(&self, f: usize) -> (usize, Option<usize>);
}

/// Edge of a triangle mesh, with its adjacent triangles
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Facet {
    /// Vertex indices, sorted
    pub vertices: [usize; 2],
    /// First adjacent triangle
    pub left: usize,
    /// Second adjacent triangle, or `None` on the mesh boundary
    pub right: Option<usize>,
}

/// Planar triangle mesh
#[derive(Clone, Debug)]
pub struct TriMesh {
    vertices: Vec<Point2<f64>>,
    triangles: Vec<[usize; 3]>,
    facets: Vec<Facet>,
}

impl TriMesh {
    /// Builds a mesh from vertex positions and triangle connectivity
    ///
    /// Facets are derived from the triangles.
    pub fn new(
        vertices: Vec<Point2<f64>>,
        triangles: Vec<[usize; 3]>,
    ) -> Result<Self, Error> {
        let n = vertices.len();
        let mut edges: HashMap<[usize; 2], usize> = HashMap::new();
        let mut facets: Vec<Facet> = vec![];
        for (t, tri) in triangles.iter().enumerate() {
            if let Some(v) = tri.iter().find(|v| **v >= n) {
                return Err(Error::BadVertex(*v, n));
            }
            for i in 0..3 {
                let (a, b) = (tri[i], tri[(i + 1) % 3]);
                let key = [a.min(b), a.max(b)];
                match edges.get(&key) {
                    Some(&f) => facets[f].right = Some(t),
                    None => {
                        edges.insert(key, facets.len());
                        facets.push(Facet {
                            vertices: key,
                            left: t,
                            right: None,
                        });
                    }
                }
            }
        }
        Ok(Self {
            vertices,
            triangles,
            facets,
        })
    }

    /// Builds a structured mesh of `nx × ny` cells, each split into two
    /// triangles, covering the axis-aligned box `[min, max]`
    pub fn grid(
        nx: usize,
        ny: usize,
        min: Point2<f64>,
        max: Point2<f64>,
    ) -> Result<Self, Error> {
        let step = (max - min).component_div(&Vector2::new(nx as f64, ny as f64));
        let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push(
                    min + Vector2::new(i as f64 * step.x, j as f64 * step.y),
                );
            }
        }
        let index = |i: usize, j: usize| j * (nx + 1) + i;
        let mut triangles = Vec::with_capacity(2 * nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let (a, b) = (index(i, j), index(i + 1, j));
                let (c, d) = (index(i + 1, j + 1), index(i, j + 1));
                triangles.push([a, b, c]);
                triangles.push([a, c, d]);
            }
        }
        Self::new(vertices, triangles)
    }

    /// Returns the position of vertex `v`
    pub fn position(&self, v: usize) -> Point2<f64> {
        self.vertices[v]
    }

    /// Returns every vertex position
    pub fn positions(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    /// Returns the triangle with index `e`
    pub fn triangle(&self, e: usize) -> [usize; 3] {
        self.triangles[e]
    }

    /// Returns the facet with index `f`
    pub fn facet(&self, f: usize) -> Facet {
        self.facets[f]
    }

    /// Returns the corner positions of triangle `e`
    pub fn corners(&self, e: usize) -> [Point2<f64>; 3] {
        self.triangles[e].map(|v| self.vertices[v])
    }

    /// Returns the (unsigned) area of triangle `e`
    pub fn area(&self, e: usize) -> f64 {
        let [a, b, c] = self.corners(e);
        0.5 * (b - a).perp(&(c - a)).abs()
    }

    /// Interpolates a function at every vertex
    pub fn interpolate<F: Fn(&Point2<f64>) -> f64>(&self, f: F) -> Vec<f64> {
        self.vertices.iter().map(f).collect()
    }

    /// Computes the gradient of the linear interpolant on triangle `e`
    ///
    /// `values` are nodal values indexed by mesh vertex.  Returns `None` if the
    /// triangle is degenerate.
    pub fn gradient(&self, e: usize, values: &[f64]) -> Option<Vector2<f64>> {
        let [i0, i1, i2] = self.triangles[e];
        let [p0, p1, p2] = self.corners(e);
        let (e1, e2) = (p1 - p0, p2 - p0);
        let m = Matrix2::new(e1.x, e1.y, e2.x, e2.y);
        let rhs =
            Vector2::new(values[i1] - values[i0], values[i2] - values[i0]);
        m.try_inverse().map(|inv| inv * rhs)
    }
}

impl Geometry for TriMesh {
    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
    fn element_count(&self) -> usize {
        self.triangles.len()
    }
    fn element_vertices(&self, e: usize) -> &[usize] {
        &self.triangles[e]
    }
    fn facet_count(&self) -> usize {
        self.facets.len()
    }
    fn facet_vertices(&self, f: usize) -> &[usize] {
        &self.facets[f].vertices
    }
    fn facet_elements(&self, f: usize) -> (usize, Option<usize>) {
        let f = &self.facets[f];
        (f.left, f.right)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn grid_topology() {
        let mesh =
            TriMesh::grid(2, 3, Point2::new(0.0, 0.0), Point2::new(2.0, 3.0))
                .unwrap();
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.element_count(), 12);

        // Euler's formula for a disk: V - E + F = 1
        assert_eq!(mesh.vertex_count() + mesh.element_count(), mesh.facet_count() + 1);

        let boundary = (0..mesh.facet_count())
            .filter(|f| mesh.facet_elements(*f).1.is_none())
            .count();
        assert_eq!(boundary, 2 * (2 + 3));

        let total: f64 = (0..mesh.element_count()).map(|e| mesh.area(e)).sum();
        assert_relative_eq!(total, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn bad_vertex() {
        let r = TriMesh::new(vec![Point2::origin(); 3], vec![[0, 1, 3]]);
        assert_eq!(r.err(), Some(Error::BadVertex(3, 3)));
    }

    #[test]
    fn linear_gradient() {
        let mesh =
            TriMesh::grid(3, 3, Point2::new(-1.0, -1.0), Point2::new(1.0, 1.0))
                .unwrap();
        let values = mesh.interpolate(|p| 2.0 * p.x - 3.0 * p.y + 1.0);
        for e in 0..mesh.element_count() {
            let g = mesh.gradient(e, &values).unwrap();
            assert_relative_eq!(g, Vector2::new(2.0, -3.0), epsilon = 1e-12);
        }
    }
}
