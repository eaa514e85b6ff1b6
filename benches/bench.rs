// Criterion benchmarks for the opportunity engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use opportunity_engine::core::{evaluate_with_reason, weighted_market_price, EstimatorParams};
use opportunity_engine::models::{BrandCriteria, Comparable, FilterSpec, RejectionReason, VehicleQuery};

fn create_comparables(count: usize) -> Vec<Comparable> {
    (0..count)
        .map(|i| Comparable {
            price: 250_000 + (i as i64 % 20) * 5_000,
            mileage_km: if i % 7 == 0 { None } else { Some(20_000 + (i as u32 % 15) * 8_000) },
            year: 2018 + (i as i32 % 5),
        })
        .collect()
}

fn create_filters(count: usize) -> Vec<FilterSpec> {
    let brands = ["Toyota", "Honda", "Nissan", "Mazda", "Kia"];

    (0..count)
        .map(|i| match i % 4 {
            0 => FilterSpec::accept_all(),
            1 => FilterSpec::custom(vec![BrandCriteria::new(brands[i % brands.len()])]),
            2 => FilterSpec::custom(vec![
                BrandCriteria::new("Toyota").models(["Corolla", "Camry", "RAV4"]),
                BrandCriteria::new(brands[i % brands.len()]).years(Some(2018), None),
            ])
            .with_price_range(150_000, 400_000),
            _ => FilterSpec::custom(vec![BrandCriteria::new("Toyota")]).with_mileage_range(0, 80_000),
        })
        .collect()
}

fn bench_weighted_market_price(c: &mut Criterion) {
    let params = EstimatorParams::default();
    let mut group = c.benchmark_group("weighted_market_price");

    for size in [10, 50, 200].iter() {
        let comparables = create_comparables(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                weighted_market_price(
                    black_box(&comparables),
                    black_box(2020),
                    black_box(Some(50_000)),
                    &params,
                )
            });
        });
    }

    group.finish();
}

fn bench_filter_evaluation(c: &mut Criterion) {
    let vehicle = VehicleQuery::new("Toyota", "Corolla", 2020).with_mileage(60_000);
    let mut group = c.benchmark_group("evaluate_with_reason");

    for size in [100, 1000].iter() {
        let filters = create_filters(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                filters
                    .iter()
                    .filter(|spec| {
                        evaluate_with_reason(black_box(spec), black_box(&vehicle), Some(210_000))
                            == RejectionReason::None
                    })
                    .count()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_weighted_market_price, bench_filter_evaluation);
criterion_main!(benches);
