//! Performance benchmarks for tpip
//!
//! Measures the CPU-bound parts of a run: scraping index pages, ordering
//! wheel versions and ranking measurements.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::time::Duration;
use tpip::{
    client::platform::platform_pattern_for,
    index::{sort_newest_first, LinkExtractor},
    models::{LatencySample, ThroughputSample},
    output::OutputFormatterFactory,
    stats,
    types::Mirror,
};

/// A simple-index page with `releases` versions, each built for a few interpreters and platforms
fn create_index_page(releases: usize) -> String {
    let mut page = String::from("<!DOCTYPE html>\n<html><body>\n");
    for i in 0..releases {
        let version = format!("{}.{}.{}", 1 + i / 20, (i / 4) % 5, i % 4);
        for python in ["cp39", "cp310", "cp311", "cp312"] {
            for platform in ["manylinux_2_28_x86_64", "macosx_11_0_arm64", "win_amd64"] {
                page.push_str(&format!(
                    "<a href=\"../../packages/{i:02x}/torch-{v}-{py}-{py}-{pl}.whl#sha256=ab{i}\">torch-{v}-{py}-{py}-{pl}.whl</a><br/>\n",
                    i = i,
                    v = version,
                    py = python,
                    pl = platform
                ));
            }
        }
        page.push_str(&format!("<a href=\"../../packages/src/torch-{}.tar.gz\">torch-{}.tar.gz</a><br/>\n", version, version));
    }
    page.push_str("</body></html>\n");
    page
}

fn create_latency_samples(count: usize) -> Vec<LatencySample> {
    (0..count)
        .map(|i| {
            let mirror = Mirror::new(format!("mirror{}", i), format!("https://m{}.example/simple", i));
            if i % 7 == 0 {
                LatencySample::failed(mirror, Some(503), "HTTP 503".to_string())
            } else {
                LatencySample::success(mirror, Duration::from_micros(5_000 + (i as u64 * 7_919) % 400_000), 200)
            }
        })
        .collect()
}

fn bench_link_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("link_extraction");
    let extractor = LinkExtractor::new(Some((3, 11)), platform_pattern_for("linux", "x86_64")).unwrap();
    let fallback = LinkExtractor::new(None, platform_pattern_for("linux", "x86_64")).unwrap();

    for releases in [10, 100, 400] {
        let page = create_index_page(releases);
        group.bench_with_input(BenchmarkId::new("matching_wheel", releases), &page, |b, page| {
            b.iter(|| extractor.extract(black_box(page)))
        });
        group.bench_with_input(BenchmarkId::new("any_wheel", releases), &page, |b, page| {
            b.iter(|| fallback.extract(black_box(page)))
        });
    }

    group.finish();
}

fn bench_version_sort(c: &mut Criterion) {
    let fallback = LinkExtractor::new(None, platform_pattern_for("linux", "x86_64")).unwrap();
    let mut links = fallback.extract(&create_index_page(200));
    links.reverse();

    c.bench_function("sort_newest_first", |b| {
        b.iter(|| {
            let mut shuffled = links.clone();
            sort_newest_first(black_box(&mut shuffled));
            shuffled
        })
    });
}

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");

    for count in [10, 100, 1000] {
        let samples = create_latency_samples(count);
        let throughput: Vec<ThroughputSample> = samples
            .iter()
            .take(5)
            .map(|s| {
                ThroughputSample::measured(
                    s.mirror.clone(),
                    format!("{}/../files/a.whl", s.mirror.url),
                    4 * 1024 * 1024,
                    Duration::from_secs(2),
                    Some(2.0),
                )
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("latency_then_merge", count), &samples, |b, samples| {
            b.iter(|| {
                let ranked = stats::rank_by_latency(black_box(samples));
                let top = stats::select_top(&ranked, 5);
                let ranked_throughput = stats::rank_by_throughput(&throughput);
                (stats::merge_rankings(&ranked_throughput, &ranked), top)
            })
        });
    }

    group.finish();
}

fn bench_table_output(c: &mut Criterion) {
    let formatter = OutputFormatterFactory::create_plain_formatter();
    let samples = create_latency_samples(50);

    c.bench_function("latency_table", |b| {
        b.iter(|| formatter.format_latency_table(black_box(&samples)))
    });
}

criterion_group!(benches, bench_link_extraction, bench_version_sort, bench_ranking, bench_table_output);
criterion_main!(benches);
