// Configuration loading tests

use lingua_live::config::Config;
use std::io::Write;

#[test]
fn test_missing_file_yields_defaults() {
    let config = Config::load("/nonexistent/lingua-live").expect("defaults");

    assert_eq!(config.service.name, "lingua-live");
    assert_eq!(config.service.port, 8787);
    assert_eq!(config.audio.input_sample_rate, 16_000);
    assert_eq!(config.audio.output_sample_rate, 24_000);
    assert_eq!(config.audio.frame_samples, 4096);
    assert!(!config.gemini.live_model.is_empty());
    assert!(!config.gemini.system_instruction.is_empty());
}

#[test]
fn test_file_overrides_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("service.toml");
    let mut file = std::fs::File::create(&path).expect("config file");
    writeln!(
        file,
        r#"
[service]
port = 9000

[gemini]
live_model = "custom-live-model"

[audio]
frame_samples = 2048
"#
    )
    .expect("write config");

    let stem = path.with_extension("");
    let config = Config::load(stem.to_str().expect("utf-8 path")).expect("load");

    assert_eq!(config.service.port, 9000);
    assert_eq!(config.gemini.live_model, "custom-live-model");
    assert_eq!(config.audio.frame_samples, 2048);

    // Untouched sections keep their defaults
    assert_eq!(config.service.bind, "127.0.0.1");
    assert_eq!(config.audio.input_sample_rate, 16_000);
}
