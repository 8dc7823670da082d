// Benchmarks for field scoring, ranking and training cycles
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use relevx::{
    CheckpointStore, EventLog, Field, FieldSpec, Forecast, MemoryCheckpointStore, MemoryEventLog, NewEvent,
    RelevanceModel, RelevanceTrainer,
};
use serde_json::{json, Value};
use std::sync::Arc;

const WORDS: &[&str] = &[
    "ivory", "tower", "stifled", "nostrum", "born", "in", "dissonance", "our", "rage", "clockworks", "bleed",
    "rational", "gaze", "demiurge", "straws", "pulled", "at", "random",
];

fn random_title(rng: &mut impl Rng) -> String {
    let len = rng.random_range(1..=4);
    (0..len)
        .map(|_| WORDS[rng.random_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn random_candidate(rng: &mut impl Rng) -> Value {
    json!({
        "name": random_title(rng),
        "created": rng.random_range(1_000_000_000_000i64..1_700_000_000_000i64),
        "genre": WORDS[rng.random_range(0..WORDS.len())],
        "length": rng.random_range(60.0f64..600.0f64),
    })
}

fn song_spec() -> FieldSpec {
    FieldSpec::default()
        .with_field("name", Field::text("name"))
        .with_field("created", Field::date("created"))
        .with_field("genre", Field::exact("genre"))
        .with_field("length", Field::number("length"))
}

fn benchmark_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity");
    let mut rng = rand::rng();
    let spec = song_spec();
    let query = random_candidate(&mut rng);
    let candidate = random_candidate(&mut rng);

    group.bench_function("bind_and_score", |b| {
        b.iter(|| black_box(spec.similarity(black_box(&query), black_box(&candidate))));
    });

    let bound = spec.bind(&query);
    group.bench_function("bound_score", |b| {
        b.iter(|| black_box(bound.score(black_box(&candidate))));
    });

    group.finish();
}

fn benchmark_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    let mut rng = rand::rng();
    let spec = song_spec();
    let query = random_candidate(&mut rng);
    let forecast = Forecast::from([
        ("name".to_string(), 0.5),
        ("created".to_string(), 0.2),
        ("genre".to_string(), 0.2),
        ("length".to_string(), 0.1),
    ]);

    for size in [100, 1000, 10000].iter() {
        let candidates: Vec<Value> = (0..*size).map(|_| random_candidate(&mut rng)).collect();
        group.bench_with_input(BenchmarkId::new("candidates", size), size, |b, _| {
            b.iter(|| black_box(spec.rank(&query, candidates.clone(), &forecast)));
        });
    }

    group.finish();
}

fn benchmark_training_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("training_cycle");
    let mut rng = rand::rng();

    for size in [100, 1000].iter() {
        let log = Arc::new(MemoryEventLog::new());
        for _ in 0..*size {
            let query = log
                .append(NewEvent::query("Song", json!({"name": random_title(&mut rng)})))
                .unwrap();
            log.append(NewEvent::selection("Song", random_candidate(&mut rng), &query))
                .unwrap();
        }

        group.bench_with_input(BenchmarkId::new("cold_start", size), size, |b, _| {
            b.iter(|| {
                let store = Arc::new(MemoryCheckpointStore::new());
                let trainer: RelevanceTrainer<RelevanceModel, _, _> =
                    RelevanceTrainer::new("Song", song_spec(), log.clone(), store.clone());
                black_box(trainer.run_training_cycle().unwrap());
                assert!(store.latest("Song").unwrap().is_some());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_similarity, benchmark_rank, benchmark_training_cycle);
criterion_main!(benches);
