//! Cut-quadrature providers
//!
//! The region algebra treats quadrature as an oracle: given a snapshot and a
//! wildcard-free [`Descriptor`], a [`CutQuadrature`] provider returns a rule
//! integrating over the described region, or `None` if the region is empty.
//!
//! [`ClipQuadrature`] is a reference provider for piecewise-linear fields on a
//! [`TriMesh`].  Because each field is affine on each triangle, the region
//! restricted to one triangle is a convex polygon (codimension 0), a segment
//! (codimension 1), or a point (codimension 2), which it finds exactly by
//! clipping.
use std::collections::BTreeSet;
use std::sync::Arc;

use arrayvec::ArrayVec;
use nalgebra::{Matrix2, Point2, Vector2};
use ordered_float::OrderedFloat;

use crate::{
    Error,
    descriptor::Descriptor,
    levelset::Snapshot,
    mesh::{Geometry, TriMesh},
    tag::Tag,
};

/// Quadrature points and weights over a region
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuadratureRule {
    /// Quadrature points
    pub points: Vec<Point2<f64>>,
    /// Weights, one per point
    pub weights: Vec<f64>,
}

impl QuadratureRule {
    /// Builds an empty rule
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a weighted point
    pub fn push(&mut self, p: Point2<f64>, w: f64) {
        self.points.push(p);
        self.weights.push(w);
    }

    /// Returns the number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Checks whether the rule has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the measure of the region (the sum of weights)
    pub fn measure(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Integrates a function over the region
    pub fn integrate<F: Fn(&Point2<f64>) -> f64>(&self, f: F) -> f64 {
        self.points
            .iter()
            .zip(&self.weights)
            .map(|(p, w)| w * f(p))
            .sum()
    }
}

/// External provider of quadrature rules on implicitly defined regions
pub trait CutQuadrature: Send + Sync {
    /// Builds a rule integrating polynomials up to `order` over `region`
    ///
    /// `region` must be free of wildcards (see
    /// [`Descriptor::expand_wildcards`]).  Returns `Ok(None)` if the region is
    /// empty; errors indicate that the provider could not answer at all.
    fn rule(
        &self,
        snapshot: &Snapshot,
        region: &Descriptor,
        order: usize,
    ) -> Result<Option<QuadratureRule>, Error>;
}

/// Affine restriction of one field to one triangle
#[derive(Copy, Clone, Debug)]
struct Affine {
    origin: Point2<f64>,
    value: f64,
    grad: Vector2<f64>,
}

impl Affine {
    fn eval(&self, p: &Point2<f64>) -> f64 {
        self.value + self.grad.dot(&(p - self.origin))
    }
}

/// Keeps the part of a convex polygon where `h <= 0`
fn clip<F: Fn(&Point2<f64>) -> f64>(
    poly: &[Point2<f64>],
    h: F,
) -> Vec<Point2<f64>> {
    let mut out = Vec::with_capacity(poly.len() + 1);
    for (i, cur) in poly.iter().enumerate() {
        let next = &poly[(i + 1) % poly.len()];
        let (hc, hn) = (h(cur), h(next));
        if hc <= 0.0 {
            out.push(*cur);
        }
        if (hc < 0.0 && hn > 0.0) || (hc > 0.0 && hn < 0.0) {
            out.push(cur + (next - cur) * (hc / (hc - hn)));
        }
    }
    out
}

/// Signed area of a polygon (positive for counter-clockwise winding)
fn polygon_area(poly: &[Point2<f64>]) -> f64 {
    let n = poly.len();
    0.5 * (0..n)
        .map(|i| poly[i].coords.perp(&poly[(i + 1) % n].coords))
        .sum::<f64>()
}

/// Finds the segment where `h = 0` within a convex polygon
fn zero_segment(
    poly: &[Point2<f64>],
    h: &Affine,
) -> Option<[Point2<f64>; 2]> {
    let mut hits = vec![];
    for (i, cur) in poly.iter().enumerate() {
        let next = &poly[(i + 1) % poly.len()];
        let (hc, hn) = (h.eval(cur), h.eval(next));
        if hc == 0.0 {
            hits.push(*cur);
        } else if hc * hn < 0.0 {
            hits.push(cur + (next - cur) * (hc / (hc - hn)));
        }
    }
    // Order hits along the zero line, then keep the extremes
    let dir = Vector2::new(-h.grad.y, h.grad.x);
    let key = |p: &Point2<f64>| OrderedFloat(dir.dot(&p.coords));
    let lo = hits.iter().min_by_key(|p| key(*p))?;
    let hi = hits.iter().max_by_key(|p| key(*p))?;
    (lo != hi).then_some([*lo, *hi])
}

/// Rounded position, used to recognize points found by several triangles
fn point_key(p: &Point2<f64>) -> (OrderedFloat<f64>, OrderedFloat<f64>) {
    (
        OrderedFloat((p.x * 1e9).round()),
        OrderedFloat((p.y * 1e9).round()),
    )
}

/// Reference cut-quadrature provider for P1 fields on a triangle mesh
///
/// Zero-dimensional regions (corners) are given a counting measure, i.e. each
/// distinct point has weight 1.
#[derive(Clone, Debug)]
pub struct ClipQuadrature {
    mesh: Arc<TriMesh>,
}

impl ClipQuadrature {
    /// Builds a provider over the given mesh
    pub fn new(mesh: Arc<TriMesh>) -> Self {
        Self { mesh }
    }

    /// Returns the mesh
    pub fn mesh(&self) -> &TriMesh {
        &self.mesh
    }

    fn affine(&self, snapshot: &Snapshot, e: usize) -> Option<Vec<Affine>> {
        let tri = self.mesh.triangle(e);
        let origin = self.mesh.position(tri[0]);
        (0..snapshot.field_count())
            .map(|i| {
                let values = snapshot.field(i);
                self.mesh.gradient(e, values).map(|grad| Affine {
                    origin,
                    value: values[tri[0]],
                    grad,
                })
            })
            .collect()
    }

    /// Clips triangle `e` by every signed constraint of `region`
    fn clip_signed(
        &self,
        e: usize,
        region: &Descriptor,
        fields: &[Affine],
    ) -> Vec<Point2<f64>> {
        let mut poly = self.mesh.corners(e).to_vec();
        for (t, f) in region.iter().zip(fields) {
            if poly.len() < 2 {
                break;
            }
            poly = match t {
                Tag::Neg => clip(&poly, |p| f.eval(p)),
                Tag::Pos => clip(&poly, |p| -f.eval(p)),
                Tag::If | Tag::Any => poly,
            };
        }
        poly
    }

    fn area_rule(poly: &[Point2<f64>], order: usize, out: &mut QuadratureRule) {
        for i in 1..poly.len().saturating_sub(1) {
            let tri = [poly[0], poly[i], poly[i + 1]];
            let area = polygon_area(&tri).abs();
            if area == 0.0 {
                continue;
            }
            if order <= 1 {
                let c = (tri[0].coords + tri[1].coords + tri[2].coords) / 3.0;
                out.push(c.into(), area);
            } else {
                // Edge-midpoint rule, exact for quadratics
                for j in 0..3 {
                    out.push(
                        nalgebra::center(&tri[j], &tri[(j + 1) % 3]),
                        area / 3.0,
                    );
                }
            }
        }
    }

    fn line_rule(seg: [Point2<f64>; 2], order: usize, out: &mut QuadratureRule) {
        let len = (seg[1] - seg[0]).norm();
        let at = |t: f64| seg[0] + (seg[1] - seg[0]) * t;
        if order <= 1 {
            out.push(at(0.5), len);
        } else {
            let d = 0.5 / 3f64.sqrt();
            out.push(at(0.5 - d), len / 2.0);
            out.push(at(0.5 + d), len / 2.0);
        }
    }

    /// Finds the point where two fields vanish, if it lies inside `poly`
    fn corner(
        poly: &[Point2<f64>],
        a: &Affine,
        b: &Affine,
    ) -> Option<Point2<f64>> {
        let m = Matrix2::new(a.grad.x, a.grad.y, b.grad.x, b.grad.y);
        // Both affines share the triangle's first corner as their origin
        let rhs = Vector2::new(-a.value, -b.value);
        let p = a.origin + m.try_inverse()? * rhs;

        // Inside test against every (counter-clockwise or clockwise) edge
        let area = polygon_area(poly);
        let scale = poly
            .iter()
            .map(|q| (q - p).norm())
            .fold(0.0, f64::max)
            .max(f64::MIN_POSITIVE);
        let inside = (0..poly.len()).all(|i| {
            let (q0, q1) = (poly[i], poly[(i + 1) % poly.len()]);
            let side = (q1 - q0).perp(&(p - q0)) * area.signum();
            side >= -1e-9 * scale * scale
        });
        inside.then_some(p)
    }
}

impl CutQuadrature for ClipQuadrature {
    fn rule(
        &self,
        snapshot: &Snapshot,
        region: &Descriptor,
        order: usize,
    ) -> Result<Option<QuadratureRule>, Error> {
        if snapshot.vertex_count() != self.mesh.positions().len() {
            return Err(Error::OracleUnavailable(format!(
                "snapshot has {} nodal values, mesh has {} vertices",
                snapshot.vertex_count(),
                self.mesh.positions().len()
            )));
        }
        if region.arity() != snapshot.field_count() {
            return Err(Error::ArityMismatch(
                region.arity(),
                snapshot.field_count(),
            ));
        }

        let mut interfaces = ArrayVec::<usize, 2>::new();
        for j in region.interfaces() {
            if interfaces.try_push(j).is_err() {
                // Three interfaces don't generically meet in the plane
                return Ok(None);
            }
        }

        let mut out = QuadratureRule::new();
        let mut corners = BTreeSet::new();
        let mut segments = BTreeSet::new();
        for e in 0..self.mesh.element_count() {
            let tri = self.mesh.triangle(e);
            if !region.admits(&snapshot.classify_all(&tri)) {
                continue;
            }
            let Some(fields) = self.affine(snapshot, e) else {
                continue; // degenerate triangle
            };
            let poly = self.clip_signed(e, region, &fields);
            match interfaces[..] {
                [] => Self::area_rule(&poly, order, &mut out),
                [j] => {
                    let Some(seg) = zero_segment(&poly, &fields[j]) else {
                        continue;
                    };
                    // A field that vanishes along a shared edge without
                    // changing sign is cut on both sides of it
                    let mut key = seg.map(|p| point_key(&p));
                    key.sort();
                    if segments.insert(key) {
                        Self::line_rule(seg, order, &mut out);
                    }
                }
                [j, k] => {
                    if poly.len() < 3 {
                        continue;
                    }
                    if let Some(p) = Self::corner(&poly, &fields[j], &fields[k])
                    {
                        // Corners on shared edges are found by every
                        // neighboring triangle
                        if corners.insert(point_key(&p)) {
                            out.push(p, 1.0);
                        }
                    }
                }
                _ => unreachable!(),
            }
        }
        Ok((!out.is_empty()).then_some(out))
    }
}
