use crate::cli::{BatchArgs, Cli, Commands};
use anyhow::{Context, Result};
use audiomirror::config::Config;
use audiomirror::engine::{
    self, AUDIO_FORMATS, BatchConfig, FfmpegEncoders, JobReport, MirrorError,
};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

/// Exit code when at least one job failed but the batch ran
const EXIT_JOB_FAILURES: i32 = 2;

pub fn run(cli: Cli) {
    match cli.command {
        Commands::Run { batch, json } => handle_run(cli.config.as_deref(), batch, json),
        Commands::Plan { batch } => handle_plan(cli.config.as_deref(), batch),
        Commands::Formats => handle_formats(),
        Commands::CheckFfmpeg { ffmpeg } => handle_check_ffmpeg(cli.config.as_deref(), ffmpeg),
        Commands::InitConfig => handle_init_config(),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Config file defaults overridden by whatever was given on the command line
fn resolve_batch(config_path: Option<&Path>, args: BatchArgs) -> Result<BatchConfig> {
    let config = load_config(config_path)?;
    let mut batch = config.batch_config(args.source, args.destination);

    if let Some(format) = args.format {
        batch.format = format;
    }
    if let Some(bitrate) = args.bitrate {
        batch.bitrate = bitrate;
    }
    if let Some(workers) = args.workers {
        batch.workers = Some(workers);
    }
    if !args.blacklist.is_empty() {
        batch.blacklist = args.blacklist;
    }
    if let Some(policy) = args.lossy {
        batch.lossy_policy = policy;
    }
    if let Some(ffmpeg) = args.ffmpeg {
        batch.ffmpeg = ffmpeg;
    }
    if let Some(secs) = args.timeout {
        batch.job_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }

    Ok(batch)
}

fn exit_fatal(err: &MirrorError) -> ! {
    eprintln!("Error: {}", err);
    process::exit(1);
}

fn handle_run(config_path: Option<&Path>, args: BatchArgs, json: bool) {
    let batch = match resolve_batch(config_path, args) {
        Ok(batch) => batch,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    install_interrupt_handler(&batch);

    let encoders = FfmpegEncoders::new(&batch.ffmpeg);
    let prepared = match engine::prepare_batch(&batch, &encoders) {
        Ok(prepared) => prepared,
        Err(e) => exit_fatal(&e),
    };

    if let Some(notice) = prepared.encoder.fallback_notice(&prepared.format) {
        println!("{}", notice);
    }
    println!("{} jobs added to the job queue", prepared.jobs.len());

    let summary = engine::execute_batch(prepared, &batch, |report| {
        if !json {
            print_report(report);
        }
    });

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error: failed to serialize summary: {}", e),
        }
    } else {
        println!("{}", summary.render());
    }

    if !summary.all_succeeded() {
        process::exit(EXIT_JOB_FAILURES);
    }
}

fn print_report(report: &JobReport) {
    match &report.error {
        Some(error) => println!("{}", error),
        None => println!(
            "worker {} completed job in {:.2?}, outputting {}, exit code: {}",
            report.worker_id,
            report.elapsed,
            report.job.destination.display(),
            report.exit_code
        ),
    }
}

/// First Ctrl+C cancels the batch, a second one exits immediately
fn install_interrupt_handler(batch: &BatchConfig) {
    let cancel = batch.cancel.clone();
    let result = ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            process::exit(130);
        }
        eprintln!("\nReceived Ctrl+C, stopping running jobs (press again to force exit)...");
        cancel.cancel();
    });
    if let Err(e) = result {
        tracing::warn!("could not install Ctrl+C handler: {}", e);
    }
}

fn handle_plan(config_path: Option<&Path>, args: BatchArgs) {
    let batch = match resolve_batch(config_path, args) {
        Ok(batch) => batch,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    let encoders = FfmpegEncoders::new(&batch.ffmpeg);
    let prepared = match engine::prepare_batch(&batch, &encoders) {
        Ok(prepared) => prepared,
        Err(e) => exit_fatal(&e),
    };

    for job in &prepared.jobs {
        if job.encode {
            let args = engine::build_arguments_with_extra(
                &job.format,
                job,
                &job.options,
                &batch.extra_args,
            );
            println!(
                "transcode {}\n  {}",
                job.source.display(),
                engine::format_ffmpeg_cmd(&batch.ffmpeg, &args)
            );
        } else {
            println!(
                "copy      {}\n  -> {}",
                job.source.display(),
                job.destination.display()
            );
        }
    }
    println!("Total jobs: {}", prepared.jobs.len());
}

fn handle_formats() {
    println!(
        "{:<8} {:<6} {:<9} {:<8} {}",
        "NAME", "EXT", "LOSSY", "BITRATE", "ENCODERS"
    );
    for format in AUDIO_FORMATS {
        let bitrate = if format.preferred_bitrate == 0 {
            "default".to_string()
        } else {
            format!("{}k", format.preferred_bitrate)
        };
        let encoders = if format.encoders.is_empty() {
            "(ffmpeg default)".to_string()
        } else {
            format.encoders.join(", ")
        };
        println!(
            "{:<8} {:<6} {:<9} {:<8} {}",
            format.name,
            format.extension,
            if format.is_lossy { "lossy" } else { "lossless" },
            bitrate,
            encoders
        );
    }
}

fn handle_check_ffmpeg(config_path: Option<&Path>, ffmpeg: Option<PathBuf>) {
    let program = ffmpeg.unwrap_or_else(|| {
        load_config(config_path)
            .map(|c| c.defaults.ffmpeg)
            .unwrap_or_else(|_| PathBuf::from("ffmpeg"))
    });

    match engine::ffmpeg_version(&program) {
        Ok(version) => println!("ffmpeg found: {}", version),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }

    match engine::probe_encoders(&program) {
        Ok(encoders) => {
            println!("{} encoders available", encoders.len());
            for format in AUDIO_FORMATS.iter().filter(|f| f.needs_encoder()) {
                let found: Vec<&str> = format
                    .encoders
                    .iter()
                    .copied()
                    .filter(|name| encoders.contains(*name))
                    .collect();
                println!(
                    "  {:<8} {}",
                    format.name,
                    if found.is_empty() {
                        "no supported encoder".to_string()
                    } else {
                        found.join(", ")
                    }
                );
            }
        }
        Err(e) => exit_fatal(&e),
    }
}

fn handle_init_config() {
    if let Err(e) = init_config() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_config() -> Result<()> {
    let path = Config::config_path()?;
    if Config::exists() {
        let cfg = Config::load_from(&path)?;
        println!("Config loaded successfully from {}", path.display());
        println!("{:#?}", cfg);
    } else {
        let saved = Config::default()
            .save()
            .context("Failed to save default config")?;
        println!("Default config saved to {}", saved.display());
    }
    Ok(())
}
