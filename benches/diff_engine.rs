//! Benchmarks for registry parsing and plan computation.
//!
//! Plan computation runs on every command, so it should stay cheap as the
//! number of mirrors and outputs grows.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use skill_sync::config::{self, Registry};
use skill_sync::diff::Plan;
use skill_sync::observer::{BehindCount, Observation, ObservedMirrorState};

/// Registry with `mirrors` sources and as many vendors, each vendor mapping
/// `skills_per_vendor` outputs.
fn generate_registry(mirrors: usize, skills_per_vendor: usize) -> String {
    let mut yaml = String::from("sources:\n");
    for i in 0..mirrors {
        yaml.push_str(&format!("  source{}: https://github.com/acme/source{}\n", i, i));
    }

    yaml.push_str("vendors:\n");
    for i in 0..mirrors {
        yaml.push_str(&format!(
            "  vendor{}:\n    source: git@github.com:acme/vendor{}.git\n    skills:\n",
            i, i
        ));
        for j in 0..skills_per_vendor {
            yaml.push_str(&format!("      skill{}: vendor{}-skill{}\n", j, i, j));
        }
    }

    yaml.push_str("manual:\n");
    for i in 0..mirrors {
        yaml.push_str(&format!("  - manual{}\n", i));
    }
    yaml
}

/// Half the declared mirrors registered and behind, plus as many extras on
/// both sides.
fn generate_observation(registry: &Registry) -> Observation {
    let mut observation = Observation::default();

    for (i, mirror) in registry.mirrors().into_iter().enumerate() {
        let registered = i % 2 == 0;
        if registered {
            observation.registered.insert(mirror.local_path.clone());
        }
        observation.mirrors.push(ObservedMirrorState {
            name: mirror.name,
            kind: mirror.kind,
            path: mirror.local_path,
            registered,
            checked_out: registered,
            behind: if registered {
                BehindCount::Known((i % 5) as u32)
            } else {
                BehindCount::Unknown
            },
            head_revision: None,
        });
    }

    let expected = registry.expected_outputs();
    for (i, output) in expected.iter().enumerate() {
        observation.registered.insert(format!("sources/extra{}", i));
        observation.outputs.insert(format!("extra{}", i));
        if i % 3 == 0 {
            observation.outputs.insert(output.clone());
        }
    }

    observation
}

fn bench_registry_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_parsing");

    for mirrors in [1, 10, 50, 200] {
        let yaml = generate_registry(mirrors, 3);
        group.bench_with_input(BenchmarkId::new("mirrors", mirrors), &yaml, |b, yaml| {
            b.iter(|| config::parse(black_box(yaml)))
        });
    }

    group.finish();
}

fn bench_plan_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_compute");

    for mirrors in [1, 10, 50, 200] {
        let Ok(registry) = config::parse(&generate_registry(mirrors, 3)) else {
            panic!("generated registry with {} mirrors is invalid", mirrors);
        };
        let observation = generate_observation(&registry);
        group.bench_with_input(
            BenchmarkId::new("mirrors", mirrors),
            &(registry, observation),
            |b, (registry, observation)| {
                b.iter(|| Plan::compute(black_box(registry), black_box(observation)))
            },
        );
    }

    // outputs dominate when vendors map many skills each
    for skills in [5, 20, 100] {
        let Ok(registry) = config::parse(&generate_registry(10, skills)) else {
            panic!("generated registry with {} skills per vendor is invalid", skills);
        };
        let observation = generate_observation(&registry);
        group.bench_with_input(
            BenchmarkId::new("skills_per_vendor", skills),
            &(registry, observation),
            |b, (registry, observation)| {
                b.iter(|| Plan::compute(black_box(registry), black_box(observation)))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_registry_parsing, bench_plan_compute);
criterion_main!(benches);
