use common::{Money, OrderStatus, UserId};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{OrderService, RatingService, average_rating};
use store::{CatalogStore, InMemoryStore, NewOrder, OrderStore};

fn bench_average(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain/average_rating");
    for size in [10usize, 100, 1000] {
        let scores: Vec<u8> = (0..size).map(|i| (i % 5) as u8 + 1).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &scores, |b, scores| {
            b.iter(|| average_rating(scores));
        });
    }
    group.finish();
}

fn bench_recompute(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let service = RatingService::new(store.clone());

    let product_id = rt.block_on(async {
        let product = store
            .insert_product("Bench Widget", Money::from_cents(1000))
            .await
            .unwrap();
        for i in 0..200 {
            let outcome = service
                .submit(product.id, UserId::new(), i % 5 + 1, None)
                .await
                .unwrap();
            service.moderate(outcome.rating.id, true).await.unwrap();
        }
        product.id
    });

    c.bench_function("domain/recompute_average_200", |b| {
        b.iter(|| {
            rt.block_on(async { service.recompute_average(product_id).await.unwrap() });
        });
    });
}

fn bench_transition(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let service = OrderService::new(store.clone());

    let order_id = rt.block_on(async {
        let order = store
            .insert_order(NewOrder {
                user_id: UserId::new(),
                total_price: Money::from_cents(5550),
                shipping_info: "Address: 1 Bench Rd".to_string(),
            })
            .await
            .unwrap();
        service
            .transition_to(order.id, OrderStatus::Confirmed)
            .await
            .unwrap();
        order.id
    });

    c.bench_function("domain/status_transition", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.transition(order_id, "READY").await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_average, bench_recompute, bench_transition);
criterion_main!(benches);
