use criterion::{black_box, criterion_group, criterion_main, Criterion};
use seqtag_core::{TagSet, ViterbiDecoder};

fn scores(seq_len: usize, num_tags: usize) -> Vec<Vec<f32>> {
    (0..seq_len)
        .map(|pos| {
            (0..num_tags)
                .map(|tag| ((pos * 31 + tag * 17) % 23) as f32 / 23.0)
                .collect()
        })
        .collect()
}

fn bench_viterbi_decode(c: &mut Criterion) {
    let tags = TagSet::conll();
    let decoder = ViterbiDecoder::new(tags.len());
    let transitions = scores(tags.len(), tags.len());
    let mask = tags.transition_mask();

    let short = scores(12, tags.len());
    let long = scores(128, tags.len());

    c.bench_function("viterbi_decode_12", |b| {
        b.iter(|| decoder.decode(black_box(&short), black_box(&transitions)).unwrap());
    });

    c.bench_function("viterbi_decode_128", |b| {
        b.iter(|| decoder.decode(black_box(&long), black_box(&transitions)).unwrap());
    });

    c.bench_function("viterbi_decode_constrained_128", |b| {
        b.iter(|| {
            decoder
                .decode_constrained(black_box(&long), black_box(&transitions), &mask)
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_viterbi_decode);
criterion_main!(benches);
