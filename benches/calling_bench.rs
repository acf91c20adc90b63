//! Throughput of the per-molecule and per-site calling passes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vclr::molecule::{call_gatc_methylation, call_sites};
use vclr::stats::accumulate_site_stats;
use vclr::{AlignmentRecord, AlignmentSet, CallMode, Orientation, Strand};

fn synthetic(molecules: usize, sites: i64) -> AlignmentSet {
    let mut records = Vec::with_capacity(molecules * sites as usize * 2);
    for read in 0..molecules {
        let label = format!("molecule_{read}");
        for site in 0..sites {
            let strand = if site % 2 == 0 { Strand::Template } else { Strand::Complement };
            let base = if (read as i64 + site) % 4 == 0 { "I" } else { "A" };
            records.push(AlignmentRecord::new(site, base, 0.8, strand, Orientation::Forward, label.as_str()));
            records.push(AlignmentRecord::new(site, "C", 0.15, strand, Orientation::Forward, label.as_str()));
        }
    }
    AlignmentSet::from_records(records)
}

fn benchmark_calling(c: &mut Criterion) {
    let mut group = c.benchmark_group("calling");
    for molecules in [64usize, 512] {
        let records = synthetic(molecules, 200);
        group.bench_with_input(BenchmarkId::new("gatc", molecules), &records, |b, records| {
            b.iter(|| black_box(call_gatc_methylation(records, 0.1).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("sites", molecules), &records, |b, records| {
            b.iter(|| black_box(call_sites(records, 0.1, CallMode::Raw).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("site_stats", molecules), &records, |b, records| {
            b.iter(|| black_box(accumulate_site_stats(records, 0.1, CallMode::Raw).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_calling);
criterion_main!(benches);
