use criterion::{black_box, criterion_group, criterion_main, Criterion};
use league_runtime::{CareerConfig, CareerEngine};

fn config(clubs_per_division: u8) -> CareerConfig {
    CareerConfig {
        divisions: 2,
        clubs_per_division,
        seed: Some(42),
        managed_club: None,
        ..CareerConfig::default()
    }
}

fn play_season(engine: &CareerEngine, config: &CareerConfig) -> usize {
    let id = engine.new_career(config).unwrap().meta.id.clone();
    engine.start_season(&id).unwrap();
    let mut played = 0;
    loop {
        let day = engine.play_next_matchday(&id).unwrap();
        if day.played.is_empty() {
            break;
        }
        played += day.played.len();
    }
    engine.end_season(&id).unwrap();
    engine.delete_career(&id).unwrap();
    played
}

fn bench_season(c: &mut Criterion) {
    let engine = CareerEngine::in_memory();
    let small = config(8);
    c.bench_function("season 2x8 clubs", |b| {
        b.iter(|| black_box(play_season(&engine, &small)))
    });
    let full = config(12);
    c.bench_function("season 2x12 clubs", |b| {
        b.iter(|| black_box(play_season(&engine, &full)))
    });
}

criterion_group!(benches, bench_season);
criterion_main!(benches);
