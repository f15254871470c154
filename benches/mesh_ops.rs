//! Benchmarks for the topology primitives.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use hemesh::algo::{triangulate, TriangulateOptions};
use hemesh::ops::split_edges;
use hemesh::prelude::*;
use nalgebra::Point3;

fn grid(n: usize) -> (Vec<Point3<f64>>, Vec<[usize; 4]>) {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n);

    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(i as f64, j as f64, 0.0));
        }
    }
    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            faces.push([v00, v00 + 1, v00 + n + 2, v00 + n + 1]);
        }
    }
    (vertices, faces)
}

fn create_grid_mesh(n: usize) -> HalfEdgeMesh {
    let (vertices, faces) = grid(n);
    build_from_quads(&vertices, &faces).unwrap()
}

fn bench_construction(c: &mut Criterion) {
    let (vertices, faces) = grid(50);

    c.bench_function("build_and_pair_grid_50x50", |b| {
        let options = FacelistOptions::new().with_cap(false);
        b.iter(|| {
            let mesh: HalfEdgeMesh = build_from_facelist(&vertices, &faces, &options).unwrap();
            mesh
        });
    });

    c.bench_function("build_merge_grid_50x50", |b| {
        let options = FacelistOptions::new().with_merge_duplicates(true);
        b.iter(|| {
            let mesh: HalfEdgeMesh = build_from_facelist(&vertices, &faces, &options).unwrap();
            mesh
        });
    });
}

fn bench_capping(c: &mut Criterion) {
    let mesh = create_grid_mesh(50);

    c.bench_function("uncap_and_cap_holes_50x50", |b| {
        b.iter_batched(
            || mesh.clone(),
            |mut mesh| mesh.cap_holes(&CapOptions::default()).unwrap(),
            BatchSize::LargeInput,
        );
    });
}

fn bench_splitting(c: &mut Criterion) {
    let mesh = create_grid_mesh(30);

    c.bench_function("split_all_edges_30x30", |b| {
        b.iter_batched(
            || mesh.clone(),
            |mut mesh| split_edges(&mut mesh),
            BatchSize::LargeInput,
        );
    });
}

fn bench_triangulation(c: &mut Criterion) {
    let mesh = create_grid_mesh(50);

    c.bench_function("triangulate_parallel_50x50", |b| {
        let options = TriangulateOptions::default();
        b.iter_batched(
            || mesh.clone(),
            |mut mesh| triangulate(&mut mesh, &options),
            BatchSize::LargeInput,
        );
    });

    c.bench_function("triangulate_sequential_50x50", |b| {
        let options = TriangulateOptions::default().sequential();
        b.iter_batched(
            || mesh.clone(),
            |mut mesh| triangulate(&mut mesh, &options),
            BatchSize::LargeInput,
        );
    });
}

fn bench_traversal(c: &mut Criterion) {
    let mesh = create_grid_mesh(50);

    c.bench_function("vertex_stars_all", |b| {
        b.iter(|| {
            let mut count = 0;
            for v in mesh.vertex_ids() {
                count += mesh.vertex_halfedges(v).count();
            }
            count
        });
    });

    c.bench_function("face_normals_all", |b| {
        b.iter(|| {
            let mut sum = nalgebra::Vector3::<f64>::zeros();
            for f in mesh.face_ids() {
                sum += mesh.face_normal(f);
            }
            sum
        });
    });
}

criterion_group!(
    benches,
    bench_construction,
    bench_capping,
    bench_splitting,
    bench_triangulation,
    bench_traversal
);
criterion_main!(benches);
