use super::*;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    move |key| map.get(key).cloned()
}

#[test]
fn defaults_are_valid() {
    let config = MatchConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.search_radius, 50.0);
    assert_eq!(config.beta, BetaPolicy::Fixed(5.0));
    assert_eq!(config.rank_length, 1);
    assert_eq!(config.workers, -1);
    assert!(config.index.replicate_boundary);
}

#[test]
fn rejects_non_positive_parameters() {
    let config = MatchConfig {
        search_radius: 0.0,
        ..MatchConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NonPositive { field: "search_radius", .. })
    ));

    let config = MatchConfig {
        sigma: f64::NAN,
        ..MatchConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NonPositive { field: "sigma", .. })
    ));

    let config = MatchConfig {
        beta: BetaPolicy::PerSecond(-1.0),
        ..MatchConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NonPositive { field: "beta", .. })
    ));

    let config = MatchConfig {
        rank_length: 0,
        ..MatchConfig::default()
    };
    assert_eq!(
        config.validate(),
        Err(ConfigError::Zero {
            field: "rank_length"
        })
    );
}

#[test]
fn worker_counts() {
    assert!(resolve_workers(-1).unwrap() >= 1);
    assert_eq!(resolve_workers(3), Ok(3));
    assert_eq!(resolve_workers(0), Err(ConfigError::InvalidWorkers(0)));
    assert_eq!(resolve_workers(-2), Err(ConfigError::InvalidWorkers(-2)));
}

#[test]
fn environment_overrides() {
    let config = MatchConfig::from_lookup(lookup(&[
        ("TRAJMATCH_SEARCH_RADIUS", "120"),
        ("TRAJMATCH_BETA_PER_SECOND", "0.5"),
        ("TRAJMATCH_GAP_POLICY", "Split"),
        ("TRAJMATCH_INDEX", "rtree"),
        ("TRAJMATCH_REPLICATE_BOUNDARY", "false"),
        ("TRAJMATCH_WORKERS", "4"),
    ]))
    .expect("overrides are valid");

    assert_eq!(config.search_radius, 120.0);
    assert_eq!(config.beta, BetaPolicy::PerSecond(0.5));
    assert_eq!(config.gap_policy, GapPolicy::Split);
    assert_eq!(config.index.kind, IndexKind::RTree);
    assert!(!config.index.replicate_boundary);
    assert_eq!(config.workers, 4);
    assert_eq!(config.sigma, MatchConfig::default().sigma);
}

#[test]
fn environment_rejects_garbage() {
    let error = MatchConfig::from_lookup(lookup(&[("TRAJMATCH_SIGMA", "wide")]))
        .expect_err("sigma is not a number");

    assert_eq!(
        error,
        ConfigError::Environment {
            key: "TRAJMATCH_SIGMA".to_string(),
            value: "wide".to_string()
        }
    );

    let error = MatchConfig::from_lookup(lookup(&[("TRAJMATCH_WORKERS", "0")]))
        .expect_err("zero workers");
    assert_eq!(error, ConfigError::InvalidWorkers(0));
}
