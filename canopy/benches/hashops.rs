//! Benchmarks tree construction, proof extraction, and verification.

use canopy::{verify, EncodedProof, HashFn, HashName, Tree};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;

fn random_leaves(n: usize) -> Vec<Vec<u8>> {
    let mut rng = rand::rng();
    (0..n)
        .map(|_| {
            let mut leaf = vec![0u8; 32];
            rng.fill(&mut leaf[..]);
            leaf
        })
        .collect()
}

fn bench_build(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("build");
    for n in [64usize, 1024, 16384] {
        let data = random_leaves(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &data, |b, data| {
            b.iter(|| Tree::new(data, HashFn::Named(HashName::Sha256)).unwrap());
        });
    }
    group.finish();
}

fn bench_prove(criterion: &mut Criterion) {
    let data = random_leaves(1024);
    let tree = Tree::new(&data, HashFn::Named(HashName::Sha256)).unwrap();
    criterion.bench_function("prove", |b| {
        b.iter(|| tree.proof_at(512).unwrap());
    });
}

fn bench_verify(criterion: &mut Criterion) {
    let data = random_leaves(1024);
    let tree = Tree::new(&data, HashFn::Named(HashName::Sha256)).unwrap();
    let proof = tree.proof_at(512).unwrap();
    criterion.bench_function("verify", |b| {
        b.iter(|| {
            verify(
                tree.root(),
                &EncodedProof::Binary(proof.clone()),
                &data[512],
                Some(HashFn::Named(HashName::Sha256)),
            )
            .unwrap()
        });
    });
}

criterion_group!(benches, bench_build, bench_prove, bench_verify);
criterion_main!(benches);
