//! Integration tests for end-to-end dataset generation.
//!
//! These tests verify the full pipeline:
//! Parse reactions → Plan scenarios → Sample → Simulate → Write → Read back

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use rules::*;

use lagchem_dataset::{
    CausalGraph, DatasetError, EdgeMode, Experiment, InitialStateSampler, Naming,
    NegativeCountPolicy, ScenarioPlan, plan, run_experiment, seeded_stream, write_graph,
};
use lagchem_runtime::{Species, load_reactions};
use lagchem_tests::{ScriptedFactory, TestHarness, workspace_root};

mod rules {
    //! Step rules for scripted engines.

    use indexmap::IndexMap;
    use lagchem_runtime::Species;

    /// Moves one particle of A to B per step while A lasts.
    pub fn a_to_b(_step: usize, counts: &mut IndexMap<Species, u64>) {
        let a = Species::from("A");
        if let Some(n) = counts.get_mut(&a).filter(|n| **n > 0) {
            *n -= 1;
            *counts.entry(Species::from("B")).or_insert(0) += 1;
        }
    }

    /// Removes every particle at the third step.
    pub fn wipe_at_step_two(step: usize, counts: &mut IndexMap<Species, u64>) {
        if step == 2 {
            counts.clear();
        }
    }
}

fn species(names: &[&str]) -> Vec<Species> {
    names.iter().map(|s| Species::from(*s)).collect()
}

/// Universe {A, B} with the single reaction A → B.
#[test]
fn test_single_reaction_ground_truth_file() {
    let harness = TestHarness::from_reactions("A -> B\n");
    let graph = CausalGraph::build(&species(&["A", "B"]), harness.catalog(), EdgeMode::Multiset);

    let path = harness.output_dir().join("groundtruth.txt");
    write_graph(&path, &graph).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let edges: HashSet<&str> = text.lines().collect();
    assert_eq!(text.lines().count(), 3);
    assert_eq!(
        edges,
        HashSet::from(["A_lag1\tA_lag0", "B_lag1\tB_lag0", "A_lag1\tB_lag0"])
    );
}

/// Four optional species, three active per run.
#[test]
fn test_four_choose_three_writes_four_files() {
    let harness = TestHarness::from_reactions("A -> B");
    let experiment = harness.redirect(
        Experiment::new("four")
            .with_steps(4)
            .with_baseline("A", 50.0)
            .with_optional("W", 10.0)
            .with_optional("X", 10.0)
            .with_optional("Y", 10.0)
            .with_optional("Z", 10.0)
            .with_scenarios(ScenarioPlan::Subsets { active: 3 })
            .with_naming(Naming::Permuted { seed: 42 })
            .with_output(".", "threes"),
    );

    let report = harness.run(&experiment, &ScriptedFactory::frozen());
    assert_eq!(report.written.len(), 4);
    assert!(report.skipped.is_empty());

    let mut names: Vec<String> = report
        .written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["threes1.tsv", "threes2.tsv", "threes3.tsv", "threes4.tsv"]);
}

/// Inactive optional species read as zero; active ones hold their draw.
#[test]
fn test_inactive_species_recorded_as_zero() {
    let harness = TestHarness::from_reactions("A -> B");
    let experiment = harness.redirect(
        Experiment::new("zeros")
            .with_steps(3)
            .with_seed(9)
            .with_baseline("A", 200.0)
            .with_optional("X", 100.0)
            .with_optional("Y", 100.0)
            .with_scenarios(ScenarioPlan::Subsets { active: 1 }),
    );

    let runs = plan(&experiment).unwrap();
    let report = harness.run(&experiment, &ScriptedFactory::frozen());
    assert_eq!(report.written.len(), 2);

    for run in &runs {
        let series = harness.read_counts(&run.path);
        let active = &run.active[0];
        let inactive = if active.as_str() == "X" { "Y" } else { "X" };
        assert_eq!(series.row(&Species::from(inactive)).unwrap(), &[0, 0, 0]);
        let held = series.row(active).unwrap();
        assert!(held.iter().all(|n| *n == held[0]));
    }
}

/// Mean 30 from a fixed seed reproduces identical counts.
#[test]
fn test_mean_thirty_sampling_is_reproducible() {
    let targets = species(&["FUMARATE", "OXALOACETATE"]);
    let sampler = InitialStateSampler::new(NegativeCountPolicy::Clamp);
    let draw = || {
        sampler
            .sample(&mut seeded_stream(1234, 0), targets.iter().map(|s| (s, 30.0)))
            .unwrap()
    };
    assert_eq!(draw(), draw());
}

/// Same experiment, same seed: byte-identical files.
#[test]
fn test_reruns_are_byte_identical() {
    let first = TestHarness::from_reactions("A -> B");
    let second = TestHarness::from_reactions("A -> B");
    let build = |harness: &TestHarness| {
        harness.redirect(
            Experiment::new("again")
                .with_steps(6)
                .with_seed(77)
                .with_baseline("A", 30.0)
                .with_scenarios(ScenarioPlan::Repeat { runs: 3 }),
        )
    };

    let a = first.run(&build(&first), &ScriptedFactory::new(a_to_b));
    let b = second.run(&build(&second), &ScriptedFactory::new(a_to_b));
    assert_eq!(a.written.len(), 3);
    for (x, y) in a.written.iter().zip(&b.written) {
        assert_eq!(x.file_name(), y.file_name());
        assert_eq!(std::fs::read(x).unwrap(), std::fs::read(y).unwrap());
    }
}

/// Files read back keep tracked order and exact values.
#[test]
fn test_series_round_trip_through_disk() {
    let harness = TestHarness::from_reactions("A -> B");
    let experiment = harness.redirect(
        Experiment::new("order")
            .with_steps(5)
            .with_seed(3)
            .with_baseline("A", 40.0)
            .with_tracked(["B", "A", "GHOST"])
            .with_naming(Naming::Fixed)
            .with_output(".", "order"),
    );

    let report = harness.run(&experiment, &ScriptedFactory::new(a_to_b));
    let series = harness.read_counts(&report.written[0]);
    assert_eq!(series.species(), species(&["B", "A", "GHOST"]).as_slice());
    assert_eq!(series.steps(), 5);

    let a = series.row(&Species::from("A")).unwrap();
    let b = series.row(&Species::from("B")).unwrap();
    for t in 0..5 {
        assert_eq!(a[t] + b[t], a[0] + b[0]);
    }
    if a[0] >= 5 {
        assert_eq!(b, &[1, 2, 3, 4, 5]);
    }
}

/// Relative abundances sum to one at every step.
#[test]
fn test_relative_abundances_sum_to_one() {
    let harness = TestHarness::from_reactions("A -> B");
    let experiment = harness.redirect(
        Experiment::new("relative")
            .with_steps(10)
            .with_seed(5)
            .with_baseline("A", 300.0)
            .with_baseline("C", 100.0)
            .with_relative(true),
    );

    let report = harness.run(&experiment, &ScriptedFactory::new(a_to_b));
    let series = harness.read_abundances(&report.written[0]);
    for t in 0..series.steps() {
        let sum: f64 = series.rows().iter().map(|r| r[t]).sum();
        assert!((sum - 1.0).abs() < 1e-12, "step {t} sums to {sum}");
    }
}

/// A run whose species all vanish is skipped; the experiment continues.
#[test]
fn test_degenerate_runs_are_skipped() {
    let harness = TestHarness::from_reactions("A -> B");
    let relative = harness.redirect(
        Experiment::new("vanishing")
            .with_steps(4)
            .with_baseline("A", 100.0)
            .with_scenarios(ScenarioPlan::Repeat { runs: 2 })
            .with_relative(true),
    );

    let report = harness.run(&relative, &ScriptedFactory::new(wipe_at_step_two));
    assert!(report.written.is_empty());
    assert_eq!(report.skipped.len(), 2);
    assert!(report.skipped[0].reason.contains("degenerate step"));
    assert!(!report.skipped[0].path.exists());

    // Raw counts have no such failure
    let counts = relative.with_relative(false);
    let report = harness.run(&counts, &ScriptedFactory::new(wipe_at_step_two));
    assert_eq!(report.written.len(), 2);
    let series = harness.read_counts(&report.written[0]);
    assert_eq!(series.row(&Species::from("A")).unwrap()[2..], [0, 0]);
}

/// Rejected negative draws skip the run instead of aborting.
#[test]
fn test_reject_policy_skips_runs() {
    let harness = TestHarness::from_reactions("A -> B");
    let experiment = harness.redirect(
        Experiment::new("reject")
            .with_steps(1)
            .with_baseline("A", 1000.0)
            .with_negative_counts(NegativeCountPolicy::Reject)
            .with_scenarios(ScenarioPlan::Repeat { runs: 10_000 }),
    );

    // About 0.13% of draws fall below zero
    let report = harness.run(&experiment, &ScriptedFactory::frozen());
    assert_eq!(report.total(), 10_000);
    assert!(!report.skipped.is_empty() && report.skipped.len() < 100);
    assert!(
        report
            .skipped
            .iter()
            .all(|s| s.reason.contains("negative initial count"))
    );
}

/// Invalid experiments fail as a whole.
#[test]
fn test_fixed_naming_with_many_runs_is_rejected() {
    let harness = TestHarness::from_reactions("A -> B");
    let experiment = harness.redirect(
        Experiment::new("clash")
            .with_naming(Naming::Fixed)
            .with_scenarios(ScenarioPlan::Repeat { runs: 2 }),
    );
    let result = run_experiment(
        &experiment,
        Arc::new(harness.catalog().clone()),
        &ScriptedFactory::frozen(),
    );
    assert!(matches!(result, Err(DatasetError::InvalidExperiment(_))));
}

/// The shipped subset recipe plans 120 runs named threes1..threes120.
#[test]
fn test_krebs3_recipe_plan() {
    let experiment = Experiment::load(workspace_root().join("experiments/krebs3.yaml")).unwrap();
    experiment.validate().unwrap();

    let runs = plan(&experiment).unwrap();
    assert_eq!(runs.len(), 120);
    assert!(runs.iter().all(|r| r.active.len() == 3));

    let names: HashSet<String> = runs
        .iter()
        .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    let expected: HashSet<String> = (1..=120).map(|n| format!("threes{n}.tsv")).collect();
    assert_eq!(names, expected);

    let reactions = experiment.reactions_path().unwrap();
    let catalog = load_reactions(&reactions).unwrap();
    assert!(experiment.unknown_species(&catalog).is_empty());
}

/// The shipped short recipe, cut down, runs on the particle container.
#[test]
fn test_krebs_short_recipe_runs_on_container() {
    let harness = TestHarness::krebs();
    let mut experiment =
        Experiment::load(workspace_root().join("experiments/krebs_short.yaml")).unwrap();
    experiment.scenarios = ScenarioPlan::Repeat { runs: 2 };
    experiment.steps = 3;
    let experiment = harness.redirect(experiment);

    let report = harness.run_container(&experiment);
    assert_eq!(report.written.len(), 2);
    assert_eq!(
        report.written[0].file_name().unwrap().to_string_lossy(),
        "short1000.tsv"
    );

    let series = harness.read_counts(&report.written[1]);
    assert_eq!(series.species().len(), 16);
    assert_eq!(series.steps(), 3);
    assert!(series.step_total(0) > 0);
}

/// Ground truth over the 16 tracked species of the subset recipe.
#[test]
fn test_krebs_ground_truth_edge_count() {
    let harness = TestHarness::krebs();
    let experiment = Experiment::load(workspace_root().join("experiments/krebs3.yaml")).unwrap();
    let universe = experiment.tracked_species();

    let graph = CausalGraph::build(&universe, harness.catalog(), EdgeMode::Multiset);
    let cross: usize = harness
        .catalog()
        .iter()
        .map(|r| r.reactants.len() * r.products.len())
        .sum();
    assert_eq!(graph.self_edges(), 16);
    assert_eq!(graph.len(), 16 + cross);

    let deduped = CausalGraph::build(&universe, harness.catalog(), EdgeMode::Set);
    let distinct: HashSet<_> = graph.edges().iter().collect();
    assert_eq!(deduped.len(), distinct.len());
}

#[test]
fn test_scripted_engine_counts_follow_rule() {
    let mut counts = IndexMap::new();
    counts.insert(Species::from("A"), 1u64);
    a_to_b(0, &mut counts);
    a_to_b(1, &mut counts);
    assert_eq!(counts.get(&Species::from("A")), Some(&0));
    assert_eq!(counts.get(&Species::from("B")), Some(&1));
}
