// End-to-end batch runs against a stand-in ffmpeg

use audiomirror::engine::{BatchConfig, LossyPolicy, MirrorError, prepare_batch, run_batch_with};
use std::collections::HashSet;
use tempfile::TempDir;

use crate::common::helpers::{library, tree};

#[test]
fn test_fatal_errors_happen_before_any_output() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("in");
    let out = dir.path().join("out");
    library(&src, &["a.flac", "b.mp3"]);

    let no_encoders = HashSet::<String>::new();

    let config = BatchConfig::new(&src, &out, "opus");
    let err = run_batch_with(&config, &no_encoders, |_| {}).unwrap_err();
    assert!(matches!(err, MirrorError::NoEncoderAvailable { .. }));
    assert!(err.to_string().contains("libopus"));

    let config = BatchConfig::new(&src, &out, "wma");
    let err = run_batch_with(&config, &no_encoders, |_| {}).unwrap_err();
    assert_eq!(err.to_string(), "unknown format wma");

    let config = BatchConfig::new(dir.path().join("missing"), &out, "flac");
    let err = run_batch_with(&config, &no_encoders, |_| {}).unwrap_err();
    assert!(matches!(err, MirrorError::InvalidRoot(_)));

    assert!(!out.exists());
}

#[test]
fn test_reencode_policy_plans_lossy_sources_as_transcodes() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("in");
    library(&src, &["a.mp3", "b.flac"]);

    let mut config = BatchConfig::new(&src, dir.path().join("out"), "flac");
    config.lossy_policy = LossyPolicy::Reencode;
    let prepared = prepare_batch(&config, &HashSet::<String>::new()).unwrap();

    assert_eq!(prepared.jobs.len(), 2);
    assert!(prepared.jobs.iter().all(|j| j.encode));
    assert!(prepared.encoder.encoder.is_empty());
}

#[cfg(unix)]
mod with_fake_ffmpeg {
    use super::*;
    use crate::common::helpers::fake_ffmpeg;
    use audiomirror::engine::{FfmpegEncoders, JobReport};
    use std::fs;

    fn config(dir: &TempDir, format: &str) -> BatchConfig {
        let mut config = BatchConfig::new(dir.path().join("in"), dir.path().join("out"), format);
        config.ffmpeg = fake_ffmpeg(dir.path());
        config.workers = Some(3);
        config
    }

    #[test]
    fn test_mirror_then_rerun_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        library(
            &dir.path().join("in"),
            &[
                "Artist A/Album/01.flac",
                "Artist A/Album/02.wav",
                "Artist A/Album/03.mp3",
                "Artist A/Album/cover.jpg",
                "Artist B/live.ogg",
                "Artist B/Rekordbox/loop.aiff",
            ],
        );

        let mut config = config(&dir, "opus");
        config.blacklist = vec!["Rekordbox".to_string()];
        let encoders = FfmpegEncoders::new(&config.ffmpeg);

        let mut workers_seen = HashSet::new();
        let mut reported = 0;
        let summary = run_batch_with(&config, &encoders, |r: &JobReport| {
            reported += 1;
            workers_seen.insert(r.worker_id);
        })
        .unwrap();

        assert_eq!(summary.planned, 4);
        assert_eq!(summary.transcoded, 2);
        assert_eq!(summary.copied, 2);
        assert!(summary.all_succeeded(), "{}", summary.render());
        assert_eq!(summary.encoder, "libopus");
        assert_eq!(reported, 4);
        assert!(workers_seen.iter().all(|id| (1..=3).contains(id)));

        assert_eq!(
            tree(&dir.path().join("out")),
            vec![
                "Artist A/Album/01.opus",
                "Artist A/Album/02.opus",
                "Artist A/Album/03.mp3",
                "Artist B/live.ogg",
            ]
        );
        assert_eq!(
            fs::read(dir.path().join("out/Artist A/Album/03.mp3")).unwrap(),
            b"audio:Artist A/Album/03.mp3"
        );
        assert_eq!(
            fs::read(dir.path().join("out/Artist A/Album/01.opus")).unwrap(),
            b"encoded"
        );

        let again = run_batch_with(&config, &encoders, |_| {}).unwrap();
        assert_eq!(again.planned, 0);
        assert!(again.all_succeeded());
    }

    #[test]
    fn test_failed_transcodes_are_retried_next_run() {
        let dir = TempDir::new().unwrap();
        library(
            &dir.path().join("in"),
            &["good/a.flac", "fail/b.flac", "fail/c.mp3"],
        );

        let config = config(&dir, "mp3");
        let encoders = FfmpegEncoders::new(&config.ffmpeg);

        let first = run_batch_with(&config, &encoders, |_| {}).unwrap();
        assert_eq!(first.planned, 3);
        assert_eq!(first.failed, 1);
        assert_eq!(first.failures.len(), 1);
        assert!(first.failures[0].source.ends_with("fail/b.flac"));
        assert_eq!(first.failures[0].exit_code, 1);
        assert!(!first.all_succeeded());

        // the copy into fail/ succeeded, only the transcode is planned again
        let second = run_batch_with(&config, &encoders, |_| {}).unwrap();
        assert_eq!(second.planned, 1);
        assert_eq!(second.failed, 1);
    }

    #[test]
    fn test_sources_mapping_to_one_output_run_once() {
        let dir = TempDir::new().unwrap();
        library(
            &dir.path().join("in"),
            &["Album/01.flac", "Album/01.mp3", "Album/02.flac", "Album/02.wav"],
        );

        let config = config(&dir, "mp3");
        let encoders = FfmpegEncoders::new(&config.ffmpeg);
        let summary = run_batch_with(&config, &encoders, |_| {}).unwrap();

        assert_eq!(summary.planned, 2);
        assert_eq!(summary.transcoded, 2);
        assert!(summary.all_succeeded(), "{}", summary.render());
        assert_eq!(
            tree(&dir.path().join("out")),
            vec!["Album/01.mp3", "Album/02.mp3"]
        );
        assert_eq!(
            fs::read(dir.path().join("out/Album/01.mp3")).unwrap(),
            b"encoded"
        );

        let again = run_batch_with(&config, &encoders, |_| {}).unwrap();
        assert_eq!(again.planned, 0);
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let dir = TempDir::new().unwrap();
        library(&dir.path().join("in"), &["x/1.flac", "x/2.mp3"]);

        let config = config(&dir, "aac");
        let encoders = FfmpegEncoders::new(&config.ffmpeg);
        let summary = run_batch_with(&config, &encoders, |_| {}).unwrap();

        let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["format"], "aac");
        assert_eq!(json["encoder"], "aac");
        assert_eq!(json["workers"], 3);
        assert_eq!(json["planned"], 2);
        assert_eq!(json["succeeded"], 2);
        assert!(json["elapsed"].is_f64());
        assert!(json["failures"].as_array().unwrap().is_empty());
        assert!(dir.path().join("out/x/1.m4a").is_file());
    }
}
