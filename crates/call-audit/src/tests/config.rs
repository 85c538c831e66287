use crate::{
    config::{Config, SourceMode},
    gemini::mime_for_extension,
};

use std::path::Path;

/// WHAT: A minimal config file parses with all defaults applied
/// WHY: Operators should only have to state what differs from defaults
#[test]
fn given_minimal_toml_when_parsing_then_defaults_applied() {
    // Given: A config stating only the required settings
    let toml = r#"
        mode = "local"

        [gemini]
        model = "gemini-2.0-flash"

        [watch]
        folder = "recordings"
        transcripts_folder = "transcripts"

        [sheet]
        workbook_path = "report.xlsx"
    "#;

    // When: Parsing
    let config: Config = toml::from_str(toml).unwrap();

    // Then: Defaults fill in the rest
    assert_eq!(config.mode, SourceMode::Local);
    assert_eq!(config.sheet.header_row, 2);
    assert_eq!(config.sheet.template_row, 3);
    assert_eq!(config.watch.max_file_size_mb, 20);
    assert_eq!(config.watch.poll_interval_secs, 60);
    assert!(config.evaluation.fail_open);
    assert!(
        config
            .watch
            .supported_extensions
            .contains(&".mp3".to_string())
    );
}

/// WHAT: Cloud mode without its identifiers fails validation
/// WHY: A half-configured cloud deployment must not start silently
#[test]
fn given_cloud_mode_without_ids_when_validating_then_error() {
    // Given: Cloud mode with an API key but no spreadsheet id
    let toml = r#"
        mode = "cloud"

        [gemini]
        api_key = "k"
        model = "gemini-2.0-flash"

        [watch]
        folder = "recordings"
        transcripts_folder = "transcripts"

        [sheet]
    "#;
    let config: Config = toml::from_str(toml).unwrap();

    // When: Validating
    let result = config.validate();

    // Then: Validation fails
    assert!(result.is_err());
}

/// WHAT: Extension filtering is case-insensitive and dot-aware
/// WHY: Recordings arrive with unpredictable extension casing
#[test]
fn given_extensions_when_filtering_then_case_ignored() {
    // Given: A watch config with default extensions
    let toml = r#"
        mode = "local"

        [gemini]
        model = "m"

        [watch]
        folder = "recordings"
        transcripts_folder = "transcripts"

        [sheet]
    "#;
    let config: Config = toml::from_str(toml).unwrap();

    // When/Then: Supported extensions match regardless of case
    assert!(config.watch.extension_supported(Path::new("call.MP3")));
    assert!(config.watch.extension_supported(Path::new("call.wav")));
    assert!(!config.watch.extension_supported(Path::new("call.txt")));
    assert!(!config.watch.extension_supported(Path::new("call")));
}

/// WHAT: Audio MIME types resolve by extension
/// WHY: Both the upload payload and the cloud listing filter use them
#[test]
fn given_audio_paths_when_resolving_mime_then_types_match() {
    // Given/When/Then: Known extensions map, unknown falls back
    assert_eq!(mime_for_extension(Path::new("a.mp3")), "audio/mpeg");
    assert_eq!(mime_for_extension(Path::new("a.WAV")), "audio/wav");
    assert_eq!(mime_for_extension(Path::new("a.m4a")), "audio/mp4");
    assert_eq!(
        mime_for_extension(Path::new("a.xyz")),
        "application/octet-stream"
    );
}
