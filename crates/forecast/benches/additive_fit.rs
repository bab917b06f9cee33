use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use branchcast_core::{BranchId, DailyPoint, DailySeries};
use branchcast_forecast::{AdditiveModel, ForecastModel};
use chrono::{Duration, NaiveDate};

fn history(days: usize) -> DailySeries {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let points = (0..days)
        .map(|d| {
            let weekly = ((d % 7) as f64 - 3.0) * 12.0;
            let noise = ((d * 31) % 17) as f64;
            DailyPoint::new(start + Duration::days(d as i64), 1_000.0 + d as f64 + weekly + noise)
        })
        .collect();
    DailySeries::new(BranchId::AGGREGATE, points).unwrap()
}

fn bench_fit_by_history_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("additive_fit");
    let model = AdditiveModel::default();

    for days in [30usize, 365, 730] {
        let series = history(days);
        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(BenchmarkId::from_parameter(days), &series, |b, series| {
            b.iter(|| model.forecast(black_box(series), 7).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit_by_history_length);
criterion_main!(benches);
