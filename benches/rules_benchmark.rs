use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use versionlens::actions::RemediationPlan;
use versionlens::config::{Config, ConfigInputs};
use versionlens::rules::engine::RulesEngine;
use versionlens::state::{ReleaseInfo, RepoContext, RepositoryState};

// Synthetic repository with `majors` x 10 minors x 10 patches.
// Every third minor alias is missing, every fifth patch lacks a release.
fn create_state(majors: u64) -> RepositoryState {
    let sha = |major: u64, minor: u64, patch: u64| {
        format!("{:040x}", major * 10_000 + minor * 100 + patch)
    };
    let mut state = RepositoryState::new(RepoContext::new("octo", "action"));
    let mut release_id = 1;

    for major in 1..=majors {
        for minor in 0..10 {
            for patch in 0..10 {
                let name = format!("v{}.{}.{}", major, minor, patch);
                state = state.with_tag(&name, &sha(major, minor, patch));
                if patch % 5 != 0 {
                    let mut release = ReleaseInfo::new(&name, release_id).immutable();
                    if patch % 7 == 0 {
                        release = release.draft();
                    }
                    state = state.with_release(release);
                    release_id += 1;
                }
            }
            if minor % 3 != 0 {
                state = state.with_tag(&format!("v{}.{}", major, minor), &sha(major, minor, 9));
            }
        }
        // Floating majors as branches at a stale SHA
        state = state.with_branch(&format!("v{}", major), &sha(major, 8, 9));
    }

    state.with_tag("latest", &sha(0, 0, 0))
}

fn benchmark_full_audit(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_audit");

    for majors in [1u64, 5, 20] {
        let state = create_state(majors);
        let engine = RulesEngine::new(Config::default());

        group.bench_with_input(BenchmarkId::from_parameter(majors), &state, |b, state| {
            b.iter(|| black_box(engine.run(black_box(state))));
        });
    }

    group.finish();
}

fn benchmark_single_category(c: &mut Criterion) {
    let state = create_state(5);

    for category in ["ref_type", "version_tracking", "releases"] {
        let mut engine = RulesEngine::new(Config::default());
        engine.set_only_categories(vec![category.to_string()]);

        c.bench_function(&format!("single_category_{}", category), |b| {
            b.iter(|| black_box(engine.run(black_box(&state))));
        });
    }
}

fn benchmark_branches_mode(c: &mut Criterion) {
    let inputs: ConfigInputs = [("floating-versions-use", "branches")]
        .into_iter()
        .collect();
    let config = Config::from_inputs(&inputs).unwrap();
    let state = create_state(5);
    let engine = RulesEngine::new(config);

    c.bench_function("branches_mode", |b| {
        b.iter(|| black_box(engine.run(black_box(&state))));
    });
}

fn benchmark_plan(c: &mut Criterion) {
    let state = create_state(5);
    let results = RulesEngine::new(Config::default()).run(&state);

    c.bench_function("remediation_plan", |b| {
        b.iter(|| black_box(RemediationPlan::from_results(black_box(&results), &state)));
    });
}

criterion_group!(
    benches,
    benchmark_full_audit,
    benchmark_single_category,
    benchmark_branches_mode,
    benchmark_plan,
);
criterion_main!(benches);
