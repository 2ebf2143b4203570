use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use proc_lifecycle::{resolver, Component, ComponentGetter, ConfigSource, Orchestrator, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct Noop {
    deps: Vec<String>,
    started: AtomicBool,
}

impl Component for Noop {
    fn type_name(&self) -> &str {
        "noop"
    }

    fn start(&self, _: &ComponentGetter, _: &ConfigSource) -> Result<()> {
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    fn reload(&self, _: &ComponentGetter, _: &ConfigSource) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {
        self.started.store(false, Ordering::Release);
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn is_running(&self, _: bool) -> bool {
        self.is_started()
    }

    fn dependencies(&self) -> Vec<String> {
        self.deps.clone()
    }
}

/// Layered graph: every key depends on up to three keys of the previous layer.
fn layered(size: usize) -> (Vec<String>, HashMap<String, Vec<String>>) {
    let keys: Vec<String> = (0..size).map(|i| format!("c{i:05}")).collect();
    let deps = keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let list = (1..=3)
                .filter_map(|d| i.checked_sub(d * 7))
                .map(|j| keys[j].clone())
                .collect();
            (key.clone(), list)
        })
        .collect();
    (keys, deps)
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for size in [10, 100, 1_000, 10_000] {
        let (mut keys, deps) = layered(size);
        keys.reverse();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(resolver::resolve(&keys, &deps).unwrap()));
        });
    }
    group.finish();
}

fn bench_start_stop(c: &mut Criterion) {
    let (_, deps) = layered(100);
    let orch = Orchestrator::new().unwrap();
    for (key, list) in deps {
        orch.component_set(key, Noop { deps: list, ..Noop::default() })
            .unwrap();
    }

    c.bench_function("start_stop_100", |b| {
        b.iter(|| {
            orch.start().unwrap();
            orch.stop();
        });
    });
}

fn bench_registration(c: &mut Criterion) {
    c.bench_function("component_set", |b| {
        let orch = Orchestrator::new().unwrap();
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            orch.component_set(format!("c{}", i % 1024), Noop::default())
                .unwrap();
        });
    });
}

criterion_group!(benches, bench_resolve, bench_start_stop, bench_registration);
criterion_main!(benches);
