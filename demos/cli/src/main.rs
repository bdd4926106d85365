use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::info;
use nalgebra::{Point2, Vector2};

use mlset::{
    Descriptor, LevelSets, MarkerSet, RegionSet, Settings, Tag,
    active::{ActiveSetBuilder, boundary_normals},
    mesh::{Geometry, TriMesh},
    oracle::CompressionContext,
    quadrature::ClipQuadrature,
};

/// Classifies a polygon built from half-planes on a structured mesh
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Shape to build
    #[clap(short, long, value_enum, default_value_t = Shape::Triangle)]
    shape: Shape,

    /// Number of half-planes (for `--shape polygon`)
    #[clap(short = 'k', long, default_value_t = 5)]
    sides: usize,

    /// Number of mesh cells along each axis
    #[clap(short, long, default_value_t = 24)]
    cells: usize,

    /// Number of threads to use (0 runs on the calling thread)
    #[clap(short, long, default_value_t = 0)]
    threads: usize,

    /// Quadrature order requested during compression
    #[clap(long, default_value_t = 1)]
    order: usize,

    /// Print an ASCII map of active and cut elements
    #[clap(short, long)]
    map: bool,
}

#[derive(ValueEnum, Clone, Copy)]
enum Shape {
    /// Right triangle with corners at (0, 0), (1, 0), (0, 1)
    Triangle,
    /// Regular polygon of radius 0.8 centered at the origin
    Polygon,
}

/// Returns `(normal, offset)` pairs; the shape is where every `n·p < offset`
fn half_planes(shape: Shape, sides: usize) -> Vec<(Vector2<f64>, f64)> {
    match shape {
        Shape::Triangle => vec![
            (Vector2::new(-1.0, 0.0), 0.0),
            (Vector2::new(0.0, -1.0), 0.0),
            (Vector2::new(1.0, 1.0), 1.0),
        ],
        Shape::Polygon => (0..sides)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / sides as f64;
                (Vector2::new(a.cos(), a.sin()), 0.8)
            })
            .collect(),
    }
}

fn print_set(name: &str, set: &RegionSet) {
    println!("{name} ({} descriptors):", set.len());
    for d in set {
        println!("  {d}");
    }
}

/// Prints one character per mesh cell, top row first
///
/// `#` marks cells whose triangles are both active and uncut, `+` marks cells
/// with a cut triangle, and `.` marks inactive cells.
fn print_map(cells: usize, active: &MarkerSet, cut: &MarkerSet) {
    for j in (0..cells).rev() {
        let row: String = (0..cells)
            .map(|i| {
                let t = 2 * (j * cells + i);
                if cut.get(t) || cut.get(t + 1) {
                    '+'
                } else if active.get(t) && active.get(t + 1) {
                    '#'
                } else {
                    '.'
                }
            })
            .collect();
        println!("  {row}");
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();
    let args = Args::parse();
    if matches!(args.shape, Shape::Polygon) && args.sides < 3 {
        bail!("a polygon needs at least 3 sides (got {})", args.sides);
    }

    let start = Instant::now();
    let mesh = Arc::new(TriMesh::grid(
        args.cells,
        args.cells,
        Point2::new(-1.0, -1.0),
        Point2::new(1.5, 1.5),
    )?);
    let planes = half_planes(args.shape, args.sides);
    let fields = planes
        .iter()
        .map(|(n, r)| mesh.interpolate(|p| n.dot(&p.coords) - r))
        .collect();
    let ls = LevelSets::new(mesh.vertex_count(), fields)?;
    let k = ls.field_count();
    info!(
        "Built {} elements and {k} fields in {:?}",
        mesh.element_count(),
        start.elapsed()
    );

    // One pool, shared by every pass below
    let settings = Settings {
        order: args.order,
        ..Settings::with_threads(args.threads)?
    };
    let snapshot = ls.snapshot();
    let ctx = CompressionContext::new(
        snapshot.clone(),
        Arc::new(ClipQuadrature::new(mesh.clone())),
        settings.clone(),
    );

    let start = Instant::now();
    let mut domain = RegionSet::new(Descriptor::uniform(k, Tag::Neg));
    let dropped = domain.compress(&ctx, true)?;
    let boundary = domain.boundary()?;
    let corners = boundary.boundary()?;
    info!("Built and compressed region sets in {:?}", start.elapsed());
    if dropped > 0 {
        info!("The domain is empty on this mesh");
    }

    print_set("domain", &domain);
    print_set("boundary", &boundary);
    print_set("corners", &corners);

    println!("measures:");
    for d in domain.iter().chain(&boundary).chain(&corners) {
        println!("  {d}: {:.6}", ctx.measure(d)?);
    }

    println!("outward normals:");
    for (d, n) in boundary_normals(&domain)? {
        let dir = (0..mesh.element_count())
            .find_map(|e| n.at(&mesh, &snapshot, e))
            .map(|v| format!("({:+.3}, {:+.3})", v.x, v.y))
            .unwrap_or_else(|| "undefined".to_owned());
        println!("  {d}: field {} ({} inside), {dir}", n.field, n.inside);
    }

    let start = Instant::now();
    let builder = ActiveSetBuilder::new(&*mesh, &snapshot, settings)?;
    let active = builder.elements(&domain)?;
    let cut = builder.cut_elements(&domain)?;
    let facets = builder.facets(&boundary)?;
    let ghost = builder.ghost_penalty_facets(&domain)?;
    info!("Built active sets in {:?}", start.elapsed());

    println!("active elements: {} / {}", active.count(), active.len());
    println!("cut elements: {}", cut.count());
    println!("boundary facets: {} / {}", facets.count(), facets.len());
    println!("ghost-penalty facets: {}", ghost.count());

    if args.map {
        println!("element map:");
        print_map(args.cells, &active, &cut);
    }
    Ok(())
}
