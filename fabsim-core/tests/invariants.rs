//! Configuration failures are reported up front, and a failed run leaves
//! nothing behind.

use fabsim_core::choice::resolve_named;
use fabsim_core::{
    ConfigError, Experiment, Good, Producer, ProducerKind, Scenario, SimConfig, SimError,
    TestCase,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn expect_config_error(result: Result<Experiment, SimError>) -> ConfigError {
    match result {
        Err(SimError::Config(e)) => e,
        Err(other) => panic!("expected a configuration error, got {other}"),
        Ok(_) => panic!("expected a configuration error, got a runnable experiment"),
    }
}

#[test]
fn zero_counts_are_rejected() {
    let cases = [
        (SimConfig::new(0, 4, 2), "simLength"),
        (SimConfig::new(5, 0, 2), "numGoods"),
        (SimConfig::new(5, 4, 0), "numConsumers"),
        (SimConfig::new(5, 4, 2).with_producers(0), "numProducers"),
        (SimConfig::new(5, 4, 2).with_trials(0), "numTrials"),
    ];
    for (config, field) in cases {
        let err = expect_config_error(Experiment::with_seed(config, 1));
        assert_eq!(err, ConfigError::NonPositive { field });
    }
}

#[test]
fn percent_factory_outside_unit_interval() {
    for pf in [-0.1, 1.5] {
        let config = SimConfig::new(5, 4, 2).with_percent_factory(pf);
        let err = expect_config_error(Experiment::with_seed(config, 1));
        assert_eq!(err, ConfigError::PercentFactoryOutOfRange(pf));
    }
}

#[test]
fn empty_catalogs_are_rejected() {
    // All goods go to factories, so fabricators would have nothing to sell
    let config = SimConfig::new(5, 4, 2)
        .with_percent_factory(1.0)
        .with_producers(2)
        .with_scenario(Scenario::All);
    match expect_config_error(Experiment::with_seed(config, 1)) {
        ConfigError::EmptyInventory { category, .. } => {
            assert_eq!(category, ProducerKind::Fabricator)
        }
        other => panic!("expected EmptyInventory, got {other}"),
    }

    // The same holds in validation mode
    let config = SimConfig::new(5, 3, 2)
        .with_percent_factory(0.2)
        .with_scenario(Scenario::Factories)
        .with_test_case(TestCase::ConstantIds);
    assert!(matches!(
        expect_config_error(Experiment::with_seed(config, 1)),
        ConfigError::EmptyInventory {
            category: ProducerKind::Factory,
            ..
        }
    ));
}

#[test]
fn all_scenario_needs_two_producers() {
    let config = SimConfig::new(5, 4, 2)
        .with_percent_factory(0.5)
        .with_producers(1)
        .with_scenario(Scenario::All);
    assert_eq!(
        expect_config_error(Experiment::with_seed(config, 1)),
        ConfigError::NoProducers {
            scenario: Scenario::All
        }
    );
}

#[test]
fn unknown_names_fail() {
    assert_eq!(
        "monopoly".parse::<Scenario>(),
        Err(ConfigError::UnknownScenario("monopoly".into()))
    );
    assert_eq!(
        "constantColors".parse::<TestCase>(),
        Err(ConfigError::UnknownTestCase("constantColors".into()))
    );

    let json = r#"{"simLength": 5, "numGoods": 4, "numConsumers": 2,
                   "percentFactory": 0.5, "scenario": "monopoly"}"#;
    assert!(matches!(Experiment::from_json(json), Err(SimError::Parse(_))));

    let json = r#"{"simLength": 5, "numGoods": 4, "numConsumers": 2,
                   "percentFactory": 0.5, "buyingDecision": "coinFlip"}"#;
    assert!(matches!(Experiment::from_json(json), Err(SimError::Parse(_))));

    let mut producers = vec![Producer::new(
        "factory_0",
        ProducerKind::Factory,
        vec![Good::new(0.3, 0.5)],
    )];
    let mut rng = StdRng::seed_from_u64(1);
    match resolve_named(&mut producers, 0.3, "coinFlip", &mut rng) {
        Err(SimError::UnknownPolicy(name)) => assert_eq!(name, "coinFlip"),
        other => panic!("expected UnknownPolicy, got {other:?}"),
    }
    assert!(producers[0].sold_goods().is_empty(), "no sale on a rejected policy");
}

#[test]
fn empty_inventory_fails_resolution() {
    let mut producers = vec![
        Producer::new("factory_0", ProducerKind::Factory, vec![Good::new(0.5, 0.5)]),
        Producer::new("fabricator_0", ProducerKind::Fabricator, Vec::new()),
    ];
    let mut rng = StdRng::seed_from_u64(1);
    for policy in ["roulette", "nonRoulette"] {
        match resolve_named(&mut producers, 0.4, policy, &mut rng) {
            Err(SimError::EmptyInventory { producer }) => assert_eq!(producer, "fabricator_0"),
            other => panic!("{policy}: expected EmptyInventory, got {other:?}"),
        }
    }
    assert!(producers[0].sold_goods().is_empty());
}

#[test]
fn failed_configuration_writes_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("results");
    let json = format!(
        r#"{{"simLength": 5, "numGoods": 2, "numConsumers": 2, "percentFactory": 0.0,
            "scenario": "factories", "outputFile": "{}"}}"#,
        output.display()
    );

    assert!(Experiment::from_json(&json).is_err());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn same_seed_same_results_file() {
    let json = r#"{"SIMLENGTH": 15, "NUMGOODS": 10, "NUMCONSUMERS": 8, "PERCENTFACTORY": 0.4,
                   "numProducers": 6, "numTrials": 4, "scenario": "all",
                   "buyingDecision": "roulette", "seed": 314}"#;

    let a = Experiment::from_json(json).unwrap().run().unwrap();
    let b = Experiment::from_json(json).unwrap().run().unwrap();
    assert_eq!(
        a.results_file().to_json().unwrap(),
        b.results_file().to_json().unwrap()
    );

    let c = Experiment::with_seed(a.config.clone(), 315).unwrap().run().unwrap();
    assert_ne!(a.run, c.run, "a different seed should change the run");
}
