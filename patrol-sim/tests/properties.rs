//! Properties that hold for any seed or cost matrix.

use patrol_sim::{
    CostMatrix, CostRange, Parameters, Rates, RunState, TerminationReason, World,
};

/// Coefficients so large that no event ever fires
fn quiet() -> Rates {
    Rates::new(60.0, 60.0, 60.0)
}

#[test]
fn same_seed_same_run() {
    let params = Parameters::default()
        .with_max_steps(80)
        .with_max_population(30)
        .with_rates(Rates::new(3.0, 0.3, 0.1));
    let mut a = World::initialize(15, 9, CostRange::default(), params, 1234).unwrap();
    let mut b = World::initialize(15, 9, CostRange::default(), params, 1234).unwrap();

    assert_eq!(a.snapshot(), b.snapshot());
    while !a.is_terminated() {
        let sa = a.step();
        let sb = b.step();
        assert_eq!(sa, sb);
        assert_eq!(
            a.snapshot(),
            b.snapshot(),
            "Runs diverged at step {}",
            a.current_step()
        );
    }
    assert!(b.is_terminated());
}

#[test]
fn same_seed_same_random_costs() {
    let params = Parameters::default();
    let a = World::initialize(6, 4, CostRange::default(), params, 99).unwrap();
    let b = World::initialize(6, 4, CostRange::default(), params, 99).unwrap();

    let times = |w: &World| -> Vec<Vec<u32>> {
        w.patrols()
            .map(|(_, p)| p.systems().iter().map(|s| s.pacification_time()).collect())
            .collect()
    };
    assert_eq!(times(&a), times(&b));
    assert_eq!(a.tmin(), b.tmin());
}

#[test]
fn random_costs_stay_in_range() {
    let range = CostRange::new(10, 20).unwrap();
    let world = World::initialize(30, 30, range, Parameters::default(), 5).unwrap();
    for (_, patrol) in world.patrols() {
        for system in patrol.systems() {
            assert!(
                (10..20).contains(&system.pacification_time()),
                "cost {} outside [10, 20)",
                system.pacification_time()
            );
        }
    }
}

#[test]
fn epidemic_keeps_five_most_comfortable() {
    let rows: Vec<Vec<u32>> = vec![
        vec![70], vec![20], vec![90], vec![40], vec![10], vec![60], vec![30], vec![80],
        vec![50], vec![100], vec![25], vec![45],
    ];
    let costs = CostMatrix::from_rows(rows).unwrap();
    let params = Parameters::default()
        .with_rates(quiet())
        .with_max_population(10);
    let mut world = World::from_cost_matrix(&costs, params, 8);

    world.step();

    assert_eq!(world.population(), 5);
    assert_eq!(world.stats().epidemics, 1);
    let mut totals: Vec<u64> = world.patrols().map(|(_, p)| p.total_time()).collect();
    totals.sort_unstable();
    assert_eq!(totals, vec![10, 20, 25, 30, 40]);
}

#[test]
fn no_epidemic_at_the_cap() {
    let rows: Vec<Vec<u32>> = (1..=6).map(|i| vec![i * 10, 5]).collect();
    let costs = CostMatrix::from_rows(rows).unwrap();
    let params = Parameters::default()
        .with_rates(quiet())
        .with_max_population(6);
    let mut world = World::from_cost_matrix(&costs, params, 8);

    world.step();

    assert_eq!(world.population(), 6);
    assert_eq!(world.stats().epidemics, 0);
}

#[test]
fn run_always_terminates_within_limit() {
    for seed in 0..20 {
        let max_steps = 25 + seed;
        let params = Parameters::default()
            .with_max_steps(max_steps)
            .with_max_population(20)
            .with_rates(Rates::new(2.0, 0.4, 0.05));
        let mut world = World::initialize(10, 6, CostRange::default(), params, seed).unwrap();

        let state = world.run();
        assert!(state.is_terminated());
        assert!(world.current_step() <= max_steps);
        if world.current_step() < max_steps {
            assert_ne!(state, RunState::Terminated(TerminationReason::StepLimit));
        }
    }
}

#[test]
fn quiet_world_runs_to_step_limit_unchanged() {
    let params = Parameters::default().with_rates(quiet()).with_max_steps(50);
    let mut world = World::initialize(8, 5, CostRange::default(), params, 17).unwrap();
    let before: Vec<u64> = world.patrols().map(|(_, p)| p.total_time()).collect();

    assert_eq!(
        world.run(),
        RunState::Terminated(TerminationReason::StepLimit)
    );
    assert_eq!(world.current_step(), 50);
    let after: Vec<u64> = world.patrols().map(|(_, p)| p.total_time()).collect();
    assert_eq!(before, after);
    assert_eq!(world.stats().realized_events(), 0);
}
