use criterion::{criterion_group, criterion_main, Criterion};
use keepsake_core::{CodecKind, Container, PersistentId, SceneIdentity, Snapshot};
use keepsake_lanes::{PipelineOptions, SavegamePipeline};
use std::hint::black_box;

fn large_container() -> Container {
    let mut container = Container::new(SceneIdentity::new(1, "Benchmark"));
    // 10,000 placed entities with transform-sized payloads, 500 spawned.
    for i in 0..10_000 {
        container.push_entity(
            PersistentId(i),
            Snapshot::new(format!(
                r#"{{"version":1,"state":{{"position":[{i}.0,1.5,-3.25],"rotation":[0,0,0,1],"alive":true}}}}"#
            )),
        );
    }
    for i in 0..500 {
        container.push_spawned("grenade", Some(Snapshot::new(format!("fuse={i}"))));
    }
    container
}

fn bench_pipelines(c: &mut Criterion) {
    let container = large_container();
    let mut group = c.benchmark_group("Savegame Pipeline");

    for codec in [CodecKind::Json, CodecKind::Xml] {
        for (compress, encrypt) in [(false, false), (true, false), (true, true)] {
            let pipeline = SavegamePipeline::new(PipelineOptions {
                codec,
                compress,
                encrypt,
                key: Some("bench-key".to_string()),
                ..PipelineOptions::default()
            })
            .expect("valid pipeline options");
            let label = pipeline.describe();
            let encoded = pipeline.encode(&container).expect("encode");

            group.bench_function(format!("encode {label}"), |b| {
                b.iter(|| black_box(pipeline.encode(black_box(&container)).unwrap()));
            });
            group.bench_function(format!("decode {label}"), |b| {
                b.iter(|| black_box(pipeline.decode(black_box(&encoded)).unwrap()));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_pipelines);
criterion_main!(benches);
