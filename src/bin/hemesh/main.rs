//! hemesh CLI - inspect and repair polygon meshes.
//!
//! Usage: hemesh [-v...] <COMMAND> <INPUT> [OUTPUT]
//!
//! Run `hemesh --help` for available commands.

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use hemesh::algo::{triangulate, Progress, TriangulateOptions};
use hemesh::io;
use hemesh::mesh::HalfEdgeMesh;
use hemesh::ops::{split_edges, CapOptions};

#[derive(Parser)]
#[command(name = "hemesh")]
#[command(author, version, about = "Half-edge mesh inspection and repair", long_about = None)]
struct Cli {
    /// Increase log output (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh statistics and validate the structure
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Close every hole with a new face
    Cap {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Give up after this many loop walks
        #[arg(long)]
        max_iterations: Option<usize>,
    },

    /// Split every polygon into triangles
    Triangulate {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Split every edge at its midpoint
    SplitEdges {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Number of rounds
        #[arg(short = 'n', long, default_value = "1")]
        rounds: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Info { input } => cmd_info(&input)?,
        Commands::Cap {
            input,
            output,
            max_iterations,
        } => cmd_cap(&input, &output, max_iterations)?,
        Commands::Triangulate {
            input,
            output,
            sequential,
        } => cmd_triangulate(&input, &output, sequential)?,
        Commands::SplitEdges {
            input,
            output,
            rounds,
        } => cmd_split_edges(&input, &output, rounds)?,
    }
    Ok(())
}

/// Progress bar on stderr that only ever moves forward.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));
    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }
        let percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };
        let previous = max_percent.fetch_max(percent, Ordering::Relaxed);
        if percent <= previous && percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        eprint!(
            "\r[{}{}] {:3}% {}",
            "=".repeat(filled),
            " ".repeat(bar_width - filled),
            percent,
            message
        );
        let _ = std::io::stderr().flush();
        if current >= total {
            eprintln!();
        }
    })
}

/// Number of closed loops formed by face-less halfedges.
fn count_boundary_loops(mesh: &HalfEdgeMesh) -> usize {
    let mut seen = HashSet::new();
    let mut loops = 0;
    for he in mesh.boundary_halfedges() {
        if seen.contains(&he) {
            continue;
        }
        loops += 1;
        for h in mesh.loop_halfedges(he) {
            seen.insert(h);
        }
    }
    loops
}

fn cmd_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: HalfEdgeMesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());
    println!("Edges: {}", mesh.num_edges());
    println!("Half-edges: {}", mesh.num_halfedges());
    println!("Unpaired half-edges: {}", mesh.num_unpaired_halfedges());
    println!("Euler characteristic: {}", mesh.euler_characteristic());

    let mut orders: Vec<usize> = mesh.face_ids().map(|f| mesh.face_order(f)).collect();
    orders.sort_unstable();
    if let (Some(min), Some(max)) = (orders.first(), orders.last()) {
        println!("Face order range: [{}, {}]", min, max);
    }
    println!("Surface area: {:.6}", mesh.surface_area());
    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    let boundary = mesh.boundary_halfedges().len();
    if boundary == 0 {
        println!("Topology: Closed (no boundary)");
    } else {
        println!(
            "Topology: Open ({} boundary half-edges in {} loops)",
            boundary,
            count_boundary_loops(&mesh)
        );
    }

    match mesh.validate() {
        Ok(()) => println!("Validation: ok"),
        Err(e) => println!("Validation: FAILED ({})", e),
    }
    Ok(())
}

fn cmd_cap(
    input: &PathBuf,
    output: &PathBuf,
    max_iterations: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh: HalfEdgeMesh = io::load(input)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let options = CapOptions { max_iterations };
    let start = Instant::now();
    let caps = mesh.cap_holes(&options)?;
    let elapsed = start.elapsed();
    println!("Capped {} holes ({:.2?})", caps.len(), elapsed);

    io::save(&mesh, output)?;
    println!("Saved: {}", output.display());
    Ok(())
}

fn cmd_triangulate(
    input: &PathBuf,
    output: &PathBuf,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh: HalfEdgeMesh = io::load(input)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let mode = if sequential { "sequential" } else { "parallel" };
    println!("Triangulating ({})...", mode);
    let options = TriangulateOptions::default()
        .with_parallel(!sequential)
        .with_progress(create_progress());
    let start = Instant::now();
    let triangles = triangulate(&mut mesh, &options);
    let elapsed = start.elapsed();
    println!("Result: {} triangles ({:.2?})", triangles.num_faces(), elapsed);

    io::save(&mesh, output)?;
    println!("Saved: {}", output.display());
    Ok(())
}

fn cmd_split_edges(
    input: &PathBuf,
    output: &PathBuf,
    rounds: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh: HalfEdgeMesh = io::load(input)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let start = Instant::now();
    for round in 0..rounds {
        let created = split_edges(&mut mesh);
        println!("Round {}: {} new vertices", round + 1, created.num_vertices());
    }
    println!(
        "Result: {} vertices, {} half-edges ({:.2?})",
        mesh.num_vertices(),
        mesh.num_halfedges(),
        start.elapsed()
    );

    io::save(&mesh, output)?;
    println!("Saved: {}", output.display());
    Ok(())
}
