use anyhow::{bail, Context, Result};
use eyecapture::camera::completion_channel;
use eyecapture::config::EyeCaptureConfig;
use eyecapture::orchestrator::machine::MSG_STOPPED;
use eyecapture::quality::SharpnessEvaluator;
use eyecapture::session::{CaptureSession, SessionUpdate};
use eyecapture::store::MemoryImageStore;
use eyecapture::testing::{SimulatedCamera, SimulatedCameraConfig, SyntheticFace};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const USAGE: &str = "Usage: eyecapture-cli <command> [args]

Commands:
  sharpness <image>... [--min <score>] [--json]
  config [--write <path>] [--path <path>]
  simulate [--participant <id>] [--images <n>] [--blurry-every <k>] [--json]";

fn main() -> Result<()> {
    eyecapture::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "sharpness" => cmd_sharpness(&args),
        "config" => cmd_config(&args),
        "simulate" => cmd_simulate(&args),
        "--help" | "-h" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}\n{}", command, USAGE);
            std::process::exit(1);
        }
    }
}

fn flag_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{} requires a value", flag))
}

fn cmd_sharpness(args: &[String]) -> Result<()> {
    let mut paths = Vec::new();
    let mut min_score = EyeCaptureConfig::load_or_default().capture.min_sharpness;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--min" => min_score = flag_value(args, &mut i, "--min")?.parse()?,
            "--json" => json = true,
            other => paths.push(PathBuf::from(other)),
        }
        i += 1;
    }
    if paths.is_empty() {
        bail!("sharpness needs at least one image path");
    }

    let evaluator = SharpnessEvaluator::new(min_score);
    let mut report = Vec::with_capacity(paths.len());
    for path in &paths {
        let image = image::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let verdict = evaluator.evaluate_dynamic(&image);
        if json {
            report.push(serde_json::json!({
                "path": path,
                "score": verdict.score,
                "accepted": verdict.accepted,
            }));
        } else {
            println!(
                "{}: {:.3} {}",
                path.display(),
                verdict.score,
                if verdict.accepted { "sharp" } else { "blurry" }
            );
        }
    }
    if json {
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}

fn cmd_config(args: &[String]) -> Result<()> {
    let mut write_to = None;
    let mut path = EyeCaptureConfig::default_path();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--write" => write_to = Some(PathBuf::from(flag_value(args, &mut i, "--write")?)),
            "--path" => path = PathBuf::from(flag_value(args, &mut i, "--path")?),
            other => bail!("Unknown config option: {}", other),
        }
        i += 1;
    }

    if let Some(target) = write_to {
        EyeCaptureConfig::default().save_to_file(&target)?;
        println!("Wrote default configuration to {}", target.display());
        return Ok(());
    }

    let config = EyeCaptureConfig::load_layered(&path)?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_simulate(args: &[String]) -> Result<()> {
    let mut config = EyeCaptureConfig::load_or_default();
    let mut participant = None;
    let mut blurry_every = 0usize;
    let mut json = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--participant" => participant = Some(flag_value(args, &mut i, "--participant")?.to_string()),
            "--images" => config.capture.images_per_eye = flag_value(args, &mut i, "--images")?.parse()?,
            "--blurry-every" => blurry_every = flag_value(args, &mut i, "--blurry-every")?.parse()?,
            "--json" => json = true,
            other => bail!("Unknown simulate option: {}", other),
        }
        i += 1;
    }
    config.validate().map_err(anyhow::Error::msg)?;

    let sharpness_plan = if blurry_every > 1 {
        (0..blurry_every).map(|k| k + 1 != blurry_every).collect()
    } else {
        vec![true]
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
            .context("Failed to install Ctrl-C handler")?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let store = MemoryImageStore::new();
        let (completions_tx, completions_rx) = completion_channel();
        let camera = SimulatedCamera::new(
            SimulatedCameraConfig {
                sharpness_plan,
                ..Default::default()
            },
            completions_tx,
            store.clone(),
        );

        let (handle, mut updates) = CaptureSession::new(config).spawn(camera, completions_rx, store);
        match participant {
            Some(p) => handle.start_for(p)?,
            None => handle.start()?,
        }

        let mut ticker = tokio::time::interval(Duration::from_millis(33));
        let mut stop_sent = false;
        let summary = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if interrupted.load(Ordering::SeqCst) && !stop_sent {
                        handle.stop(MSG_STOPPED)?;
                        stop_sent = true;
                    }
                    let eye = handle.snapshot().eye;
                    handle.submit_frame(SyntheticFace::centered_on(eye).frame(640, 480));
                }
                update = updates.recv() => match update {
                    Some(SessionUpdate::Finished(summary)) => break summary,
                    Some(SessionUpdate::Status(message)) if !json => println!("{}", message),
                    Some(_) => {}
                    None => bail!("Capture session ended without a summary"),
                },
            }
        };

        let dropped = handle.dropped_frames();
        handle.shutdown().await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!(
                "{} images kept, {} retakes, {} frames dropped",
                summary.kept.len(),
                summary.discarded,
                dropped
            );
        }
        if let Some(failure) = summary.failure() {
            eprintln!("{}", failure);
            std::process::exit(2);
        }
        Ok::<(), anyhow::Error>(())
    })
}
