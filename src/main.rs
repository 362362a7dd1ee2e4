use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use meshbvh::bvh::Bvh;
use meshbvh::config::{BuildConfig, SplitStrategy, StopRule};
use meshbvh::mesh_chunk::MeshChunk;
use meshbvh::ray::Ray;
use meshbvh::triangle::Triangle;
use meshbvh::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Evenly spaced candidate planes on all three axes.
    Sampled,
    /// One plane through the middle of the longest axis.
    Midpoint,
}

/// Builds a BVH over a triangle mesh and reports its shape.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Wavefront OBJ file to load. A random triangle soup is generated if omitted.
    #[arg(long)]
    obj: Option<PathBuf>,

    /// Number of random triangles to generate.
    #[arg(long, default_value_t = 10_000)]
    triangles: usize,

    /// Seed for generated triangles and rays.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(long, default_value_t = BuildConfig::default().depth_limit)]
    depth_limit: u32,

    #[arg(long, default_value_t = BuildConfig::default().candidate_splits_per_axis)]
    candidate_splits: usize,

    /// Split until leaves hold at most this many triangles instead of stopping when
    /// splitting no longer lowers the cost.
    #[arg(long)]
    max_triangles_per_leaf: Option<usize>,

    #[arg(long, value_enum, default_value_t = Strategy::Sampled)]
    split_strategy: Strategy,

    #[arg(long, default_value_t = BuildConfig::default().parallel_threshold)]
    parallel_threshold: usize,

    /// Print the tree, one node per line.
    #[arg(long)]
    print_tree: bool,

    /// Cast this many random rays and compare the flat traversal to a brute force scan.
    #[arg(long, default_value_t = 0)]
    rays: usize,

    /// Write the raw node records to this file.
    #[arg(long)]
    nodes_out: Option<PathBuf>,

    /// Write the raw triangle records to this file.
    #[arg(long)]
    triangles_out: Option<PathBuf>,
}

impl Cli {
    fn build_config(&self) -> BuildConfig {
        BuildConfig::default()
            .with_depth_limit(self.depth_limit)
            .with_candidate_splits_per_axis(self.candidate_splits)
            .with_stop_rule(match self.max_triangles_per_leaf {
                Some(max) => StopRule::MaxTrianglesPerLeaf(max),
                None => StopRule::CostImprovement,
            })
            .with_split_strategy(match self.split_strategy {
                Strategy::Sampled => SplitStrategy::SampledPlanes,
                Strategy::Midpoint => SplitStrategy::LongestAxisMidpoint,
            })
            .with_parallel_threshold(self.parallel_threshold)
    }
}

fn load_mesh(path: &Path) -> Result<MeshChunk> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mesh: obj::Obj<obj::Position, u32> = obj::load_obj(BufReader::new(file))
        .with_context(|| format!("failed to decode {}", path.display()))?;

    let positions: Vec<Point3> = mesh
        .vertices
        .iter()
        .map(|vertex| Point3::from(vertex.position))
        .collect();
    let name = mesh
        .name
        .or_else(|| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()));
    Ok(MeshChunk::from_indexed(name, &positions, &mesh.indices)?)
}

fn random_point(rng: &mut StdRng, extent: f32) -> Point3 {
    Point3::new(
        rng.random_range(-extent..=extent),
        rng.random_range(-extent..=extent),
        rng.random_range(-extent..=extent),
    )
}

fn random_mesh(rng: &mut StdRng, count: usize) -> Result<MeshChunk> {
    let corners: Vec<[Point3; 3]> = (0..count)
        .map(|_| {
            let center = random_point(rng, 1000.0);
            [
                center + random_point(rng, 1.0).coords,
                center + random_point(rng, 1.0).coords,
                center + random_point(rng, 1.0).coords,
            ]
        })
        .collect();
    Ok(MeshChunk::from_vertices(
        Some("random".to_string()),
        &corners,
    )?)
}

/// Casts random rays through the mesh bounds and checks the flat traversal against a
/// brute force scan of all triangles.
fn check_rays(rng: &mut StdRng, bvh: &Bvh, triangles: &[Triangle], count: usize) -> Result<()> {
    let flat = bvh.flatten(0, 0);
    let bounds = meshbvh::aabb::Bounded::bounds(bvh.root());
    let extent = bounds.size().norm();

    let mut hits = 0;
    let mut mismatches = 0;
    let start = Instant::now();
    for _ in 0..count {
        let origin = bounds.center() + random_point(rng, extent).coords;
        let target = bounds.center() + random_point(rng, extent / 4.0).coords;
        let ray = Ray::new(origin, target - origin);

        let flat_hits = flat.traverse(&ray).len();
        let expected = triangles
            .iter()
            .filter(|triangle| ray.intersects_triangle(*triangle))
            .count();
        hits += flat_hits;
        if flat_hits != expected {
            mismatches += 1;
            tracing::warn!(?ray, flat_hits, expected, "traversal disagrees with brute force");
        }
    }
    println!(
        "rays: {}, triangle hits: {}, mismatches: {}, took {:?}",
        count,
        hits,
        mismatches,
        start.elapsed()
    );
    if mismatches > 0 {
        anyhow::bail!("{} of {} rays disagree with brute force", mismatches, count);
    }
    Ok(())
}

fn write_buffer(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote buffer");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.build_config();
    let mut rng = StdRng::seed_from_u64(cli.seed);

    let chunk = match &cli.obj {
        Some(path) => load_mesh(path)?,
        None => random_mesh(&mut rng, cli.triangles)?,
    };
    tracing::info!(mesh = ?chunk.name(), triangles = chunk.len(), "loaded mesh");
    let triangles = chunk.triangles().to_vec();

    let start = Instant::now();
    let bvh = Bvh::build(chunk, &config)?;
    println!("built in {:?}", start.elapsed());
    println!("{}", bvh.stats());

    if cli.print_tree {
        print!("{}", bvh);
    }

    if cli.rays > 0 {
        check_rays(&mut rng, &bvh, &triangles, cli.rays)?;
    }

    if cli.nodes_out.is_some() || cli.triangles_out.is_some() {
        let flat = bvh.flatten(0, 0);
        if let Some(path) = &cli.nodes_out {
            write_buffer(path, flat.nodes_bytes())?;
        }
        if let Some(path) = &cli.triangles_out {
            write_buffer(path, flat.triangles_bytes())?;
        }
    }
    Ok(())
}
