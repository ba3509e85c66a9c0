use super::*;

const SAMPLE: &str = r#"
wallet: "coldkey"
validator: "5F4tQyWrhfGVcNhoqeiNsR6KjD4wMZ2kfhLj4oHYuyHbZAc3"
stake_amount: 0.5
exclude_list: [3, 11]
ema_alpha: 0.2
preferences:
  "4": 1.5
  "9": 2.0
telegram_update_interval: 5
paused: true
allocation_policy: "top-k"
allocation_top_k: 2
"#;

#[test]
fn test_load_sample_config() {
    let config = BotConfig::from_yaml_str(SAMPLE).unwrap();

    assert_eq!(config.wallet, "coldkey");
    assert_eq!(config.stake_amount, 0.5);
    assert_eq!(config.exclude_list, vec![3, 11]);
    assert_eq!(config.ema_alpha, 0.2);
    assert_eq!(config.telegram_update_interval, 5);
    assert!(config.paused);
    assert!(config.telegram_token.is_none());
    assert_eq!(config.cycle_interval_secs, 12);
    assert_eq!(
        config.policy().unwrap(),
        crate::allocator::AllocationPolicy::TopK { k: 2 }
    );
}

#[test]
fn test_initial_preferences_from_config() {
    let config = BotConfig::from_yaml_str(SAMPLE).unwrap();
    let prefs = config.initial_preferences().unwrap();

    assert_eq!(prefs.base_amount(), 0.5);
    assert_eq!(prefs.get_multiplier(4), 1.5);
    assert_eq!(prefs.get_multiplier(9), 2.0);
    assert_eq!(prefs.get_multiplier(1), 1.0);
    assert!(prefs.is_excluded(3));
    assert!(prefs.is_excluded(11));
    assert!(!prefs.is_excluded(4));
}

#[test]
fn test_defaults_apply() {
    let config = BotConfig::from_yaml_str("wallet: w\nstake_amount: 1.0\n").unwrap();

    assert_eq!(config.ema_alpha, 0.1);
    assert_eq!(config.telegram_update_interval, 10);
    assert!(!config.paused);
    assert_eq!(
        config.policy().unwrap(),
        crate::allocator::AllocationPolicy::SingleBest
    );
}

#[test]
fn test_rejects_bad_alpha() {
    assert!(BotConfig::from_yaml_str("wallet: w\nstake_amount: 1.0\nema_alpha: 0\n").is_err());
    assert!(BotConfig::from_yaml_str("wallet: w\nstake_amount: 1.0\nema_alpha: 1.5\n").is_err());
}

#[test]
fn test_rejects_non_positive_stake_amount() {
    assert!(BotConfig::from_yaml_str("wallet: w\nstake_amount: 0\n").is_err());
}

#[test]
fn test_rejects_bad_preference_entries() {
    let bad_key = "wallet: w\nstake_amount: 1.0\npreferences:\n  abc: 1.5\n";
    assert!(BotConfig::from_yaml_str(bad_key).is_err());

    let below_floor = "wallet: w\nstake_amount: 1.0\npreferences:\n  \"4\": 0.01\n";
    assert!(BotConfig::from_yaml_str(below_floor).is_err());
}

#[test]
fn test_rejects_unknown_policy() {
    let yaml = "wallet: w\nstake_amount: 1.0\nallocation_policy: random\n";
    assert!(BotConfig::from_yaml_str(yaml).is_err());
}
