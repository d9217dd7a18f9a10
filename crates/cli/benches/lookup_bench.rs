use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use engine::{Store, StoreOptions};
use tree::{Tree, Value};

const N_SECTIONS: usize = 100;
const N_KEYS: usize = 100;

fn build_store() -> Store {
    let mut store = Store::new();
    for locale in ["en", "fr"] {
        let mut root = Tree::new();
        for section in 0..N_SECTIONS {
            let mut sub = Tree::new();
            for key in 0..N_KEYS {
                sub.insert(
                    format!("key{key}"),
                    Value::str(format!("{locale} value {section}/{key}")),
                );
            }
            root.insert(format!("section{section}"), Value::Map(sub));
        }
        store
            .store_translations(locale, root, &StoreOptions::default())
            .unwrap();
    }
    store
}

fn compact_benchmark(c: &mut Criterion) {
    c.bench_function("compact_2_locales_10k_keys", |b| {
        b.iter_batched(
            build_store,
            |mut store| {
                store.compact().unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn lookup_hit_benchmark(c: &mut Criterion) {
    c.bench_function("compacted_lookup_hit_10k", |b| {
        let mut store = build_store();
        store.compact().unwrap();

        b.iter(|| {
            for section in 0..N_SECTIONS {
                let key = format!("section{section}.key{}", section % N_KEYS);
                let v = store.lookup("en", &key, &[]);
                assert!(v.is_some());
            }
        });
    });
}

fn subtree_benchmark(c: &mut Criterion) {
    c.bench_function("subtree_reconstruction_100_children", |b| {
        let mut store = build_store();
        store.compact().unwrap();

        b.iter(|| {
            let v = store.lookup("en", "section0", &[]);
            assert!(matches!(v, Some(Value::Map(_))));
        });
    });
}

criterion_group!(
    benches,
    compact_benchmark,
    lookup_hit_benchmark,
    subtree_benchmark
);
criterion_main!(benches);
