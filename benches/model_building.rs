//! Benchmarks for model validation, building and solving
//!
//! The models are generated assignment problems: n workers, n tasks, a cost for every
//! pair and one binary variable per pair, with every worker and every task assigned
//! exactly once.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use daisy::lp_model_builder;
use daisy::lp_solver::SolverBackend;
use daisy::model::{SolveOptions, build, solve};
use daisy::schema::ModelSpec;
use serde_json::{Value, json};

/// Problem sizes (workers = tasks)
const SIZES: &[usize] = &[5, 10, 20, 40];

/// Generate an assignment model with deterministic costs
fn assignment_model(n: usize) -> Value {
    let workers = (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>();
    let tasks = (0..n).map(|j| format!("t{}", j)).collect::<Vec<_>>();

    let cost = workers
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let row = tasks
                .iter()
                .enumerate()
                .map(|(j, t)| (t.clone(), json!(((i * 7 + j * 13) % 17) + 1)))
                .collect::<serde_json::Map<_, _>>();
            (w.clone(), Value::Object(row))
        })
        .collect::<serde_json::Map<_, _>>();

    json!({
        "model_name": format!("assignment{}", n),
        "sets": { "Workers": workers, "Tasks": tasks },
        "parameters": { "Cost": cost },
        "variables": {
            "assign": { "indices": { "w": "Workers", "t": "Tasks" }, "type": "Binary" }
        },
        "objective": {
            "sense": "minimize",
            "expression": "sum(Cost[w][t] * assign[w, t] for w in Workers for t in Tasks)"
        },
        "constraints": {
            "one_task": {
                "indices": { "w": "Workers" },
                "expression": "sum(assign[w, t] for t in Tasks) == 1"
            },
            "one_worker": {
                "indices": { "t": "Tasks" },
                "expression": "sum(assign[w, t] for w in Workers) == 1"
            }
        }
    })
}

fn backend() -> SolverBackend {
    SolverBackend::from_env_or_default().expect("an LP backend must be enabled")
}

/// Benchmark document validation
fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");

    for &n in SIZES {
        let document = assignment_model(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &document, |b, document| {
            b.iter(|| black_box(ModelSpec::from_json(black_box(document)).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark index expansion and expression evaluation into an LP builder
fn bench_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("building");
    let backend = backend();
    let options = SolveOptions::default();

    for &n in SIZES {
        let spec = ModelSpec::from_json(&assignment_model(n)).unwrap();
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &spec, |b, spec| {
            b.iter(|| {
                let mut builder = lp_model_builder!(BenchModel);
                let table = build(black_box(spec), &options, backend, &mut builder).unwrap();
                black_box((table.len(), builder.constraint_count()))
            })
        });
    }

    group.finish();
}

/// Benchmark the whole pipeline on the smaller sizes
fn bench_solving(c: &mut Criterion) {
    let mut group = c.benchmark_group("solving");
    group.sample_size(10);
    let options = SolveOptions {
        solver: Some(backend()),
        ..SolveOptions::default()
    };

    for &n in &SIZES[..3] {
        let spec = ModelSpec::from_json(&assignment_model(n)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &spec, |b, spec| {
            b.iter(|| {
                let result = solve(black_box(spec), &options).unwrap();
                assert!(result.is_optimal());
                black_box(result.objective_value)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_validation, bench_building, bench_solving);
criterion_main!(benches);
