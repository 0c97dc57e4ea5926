use std::env;
use std::path::PathBuf;
use worksheet_engine::config::{Config, EngineConfig, LoggingConfig};

const ENGINE_VARS: [&str; 6] = [
    "MIN_SIMILARITY_SCORE",
    "SIMILAR_TOP_N",
    "RETEST_DEFAULT_SELECTION",
    "RETEST_SIMILAR_PER_QUESTION",
    "AUTO_TAG_BULK_THRESHOLD",
    "RETEST_RNG_SEED",
];

fn clear_engine_vars() {
    for name in ENGINE_VARS {
        unsafe { env::remove_var(name) };
    }
}

// Environment is process-wide, so every env scenario runs inside this one test
#[test]
fn test_environment_variable_scenarios() {
    clear_engine_vars();
    unsafe {
        env::remove_var("SEED_DATA_PATH");
        env::remove_var("PORT");
        env::remove_var("HOST");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.data.seed_path, PathBuf::from("data/seed.json"));
    assert_eq!(config.engine.min_similarity_score, 30);
    assert_eq!(config.engine.similar_top_n, 5);
    assert_eq!(config.engine.retest_default_selection, 5);
    assert_eq!(config.engine.retest_similar_per_question, 3);
    assert_eq!(config.engine.auto_tag_bulk_threshold, 80);
    assert_eq!(config.engine.retest_rng_seed, None);
    assert_eq!(config.server.port, 3000);
    println!("✅ Defaults applied with no environment");

    // Logging settings load on their own, ahead of the full config
    unsafe { env::set_var("LOG_DIRECTORY", "/tmp/worksheet-logs") };
    let logging = LoggingConfig::from_env().unwrap();
    assert_eq!(logging.log_directory, "/tmp/worksheet-logs");
    assert_eq!(Config::from_env().unwrap().logging.log_directory, logging.log_directory);
    unsafe { env::remove_var("LOG_DIRECTORY") };
    println!("✅ Logging config loads standalone");

    unsafe {
        env::set_var("MIN_SIMILARITY_SCORE", "45");
        env::set_var("SIMILAR_TOP_N", "10");
        env::set_var("AUTO_TAG_BULK_THRESHOLD", "90");
        env::set_var("RETEST_RNG_SEED", "1234");
        env::set_var("SEED_DATA_PATH", "/tmp/questions.json");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.engine.min_similarity_score, 45);
    assert_eq!(config.engine.similar_top_n, 10);
    assert_eq!(config.engine.auto_tag_bulk_threshold, 90);
    assert_eq!(config.engine.retest_rng_seed, Some(1234));
    assert_eq!(config.data.seed_path, PathBuf::from("/tmp/questions.json"));
    assert!(config.validate().is_ok());
    println!("✅ Engine overrides picked up");

    unsafe { env::set_var("SIMILAR_TOP_N", "lots") };
    assert!(Config::from_env().is_err());
    println!("✅ Non-numeric override rejected");

    unsafe { env::set_var("SIMILAR_TOP_N", "5") };
    unsafe { env::set_var("RETEST_RNG_SEED", "-1") };
    assert!(Config::from_env().is_err());
    println!("✅ Negative seed rejected");

    unsafe { env::remove_var("RETEST_RNG_SEED") };
    unsafe { env::set_var("MIN_SIMILARITY_SCORE", "150") };
    let config = Config::from_env().unwrap();
    assert!(config.validate().is_err());
    println!("✅ Out-of-range threshold fails validation");

    clear_engine_vars();
    unsafe { env::remove_var("SEED_DATA_PATH") };
}

#[test]
fn test_engine_config_defaults() {
    let defaults = EngineConfig::default();

    assert_eq!(defaults.min_similarity_score, 30);
    assert_eq!(defaults.similar_top_n, 5);
    assert_eq!(defaults.retest_default_selection, 5);
    assert_eq!(defaults.retest_similar_per_question, 3);
    assert_eq!(defaults.auto_tag_bulk_threshold, 80);
    assert!(defaults.retest_rng_seed.is_none());
}
