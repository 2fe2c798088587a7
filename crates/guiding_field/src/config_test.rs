use super::*;

#[test]
fn test_defaults() {
  let config = FieldConfig::default();
  assert_eq!(config.min_samples_per_leaf, 100);
  assert_eq!(config.max_samples_per_leaf, 32_000);
  assert_eq!(config.max_depth, 32);
  assert!(!config.use_stochastic_lookup);
  assert!(!config.deterministic);
  assert_eq!(config.decay_on_split, 0.25);
  assert_eq!(config.num_threads, 0);
  assert!(config.validate().is_ok());
}

#[test]
fn test_deterministic_preset() {
  let config = FieldConfig::DETERMINISTIC;
  assert!(config.deterministic);
  assert_eq!(config.max_samples_per_leaf, FieldConfig::DEFAULT.max_samples_per_leaf);
}

#[test]
fn test_validate_rejects_bad_values() {
  let base = FieldConfig::default();

  let config = FieldConfig {
    max_samples_per_leaf: 0,
    min_samples_per_leaf: 0,
    ..base
  };
  assert_eq!(config.validate(), Err(ConfigError::ZeroMaxSamples));

  let config = FieldConfig {
    min_samples_per_leaf: 200,
    max_samples_per_leaf: 100,
    ..base
  };
  assert_eq!(
    config.validate(),
    Err(ConfigError::MinExceedsMax { min: 200, max: 100 })
  );

  let config = FieldConfig {
    max_depth: 0,
    ..base
  };
  assert_eq!(config.validate(), Err(ConfigError::ZeroMaxDepth));

  for decay in [0.0f32, -0.5, 1.5, f32::NAN] {
    let config = FieldConfig {
      decay_on_split: decay,
      ..base
    };
    assert!(
      matches!(config.validate(), Err(ConfigError::DecayOutOfRange(_))),
      "decay {decay} should be rejected"
    );
  }

  let config = FieldConfig {
    stochastic_neighbors: 0,
    ..base
  };
  assert_eq!(config.validate(), Err(ConfigError::ZeroNeighbors));
}

#[test]
fn test_decay_of_one_is_valid() {
  let config = FieldConfig {
    decay_on_split: 1.0,
    ..FieldConfig::default()
  };
  assert!(config.validate().is_ok());
}

#[test]
fn test_estimated_leaf_count() {
  let config = FieldConfig {
    max_samples_per_leaf: 100,
    ..FieldConfig::default()
  };
  assert_eq!(config.estimated_leaf_count(0), 32);
  assert_eq!(config.estimated_leaf_count(1000), 52);
}

#[test]
fn test_display_lists_every_setting() {
  let text = FieldConfig::default().to_string();
  for key in [
    "min_samples_per_leaf",
    "max_samples_per_leaf",
    "max_depth",
    "use_stochastic_lookup",
    "stochastic_neighbors",
    "deterministic",
    "decay_on_split",
    "num_threads",
  ] {
    assert!(text.contains(key), "missing {key} in:\n{text}");
  }
}

#[cfg(feature = "serde")]
#[test]
fn test_partial_toml_fills_defaults() {
  let config: FieldConfig = toml::from_str(
    r#"
      max_samples_per_leaf = 500
      use_stochastic_lookup = true
    "#,
  )
  .expect("valid toml");

  assert_eq!(config.max_samples_per_leaf, 500);
  assert!(config.use_stochastic_lookup);
  assert_eq!(config.max_depth, 32);
  assert_eq!(config.decay_on_split, 0.25);
}
