use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use fuzzy_device::capability::CapabilitySet;
use fuzzy_device::codes::{EV_ABS, EV_KEY, EV_REL};
use fuzzy_device::event::{FieldUpdate, Timestamp};
use fuzzy_device::recorder::{self, EventLog};
use fuzzy_device::sampler::{sample_device, FieldPool, StreamSampler};
use fuzzy_device::sequence::Sequence;

fn bench_sample_device(c: &mut Criterion) {
    c.bench_function("sample_device", |b| {
        let mut seq = Sequence::new(42);
        b.iter(|| black_box(sample_device(&mut seq, "bench")))
    });
}

fn bench_stream(c: &mut Criterion) {
    let mut caps = CapabilitySet::new();
    for code in 0..64 {
        caps.enable(EV_KEY, code, None);
    }
    caps.enable(EV_REL, 0, None);
    caps.enable(EV_REL, 1, None);
    caps.enable(EV_ABS, 0, None);
    let pool = FieldPool::from_capabilities(&caps);

    c.bench_function("stream_full", |b| {
        b.iter_batched(
            || Sequence::new(fastrand::u64(..)),
            |mut seq| {
                let mut sampler = StreamSampler::new(&mut seq, &pool, Timestamp::default());
                let mut t = 0;
                let mut n = 0;
                while let Some(frame) = sampler.next_frame(Timestamp::from_micros(t)) {
                    t += 1000;
                    n += frame.updates.len();
                }
                black_box(n)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_event_log(c: &mut Criterion) {
    let update = FieldUpdate {
        type_: EV_KEY,
        code: 30,
        value: 1,
    };
    let ts = Timestamp::from_micros(1_234_567);

    c.bench_function("write_update", |b| {
        let mut log = EventLog::new(std::io::sink());
        b.iter(|| log.write_update(black_box(ts), black_box(&update)))
    });

    let mut line = EventLog::new(Vec::new());
    let _ = line.write_update(ts, &update);
    let line = String::from_utf8(line.into_inner()).unwrap_or_default();
    c.bench_function("parse_event_line", |b| {
        b.iter(|| recorder::parse_event_line(black_box(line.trim_end())))
    });
}

criterion_group!(benches, bench_sample_device, bench_stream, bench_event_log);
criterion_main!(benches);
