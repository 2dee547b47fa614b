use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use std::io::Read;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shopforge::cli::{Args, Command, GenerateArgs, PreviewArgs};
use shopforge::config::Config;
use shopforge::errors::ForgeError;
use shopforge::normalize::normalize;
use shopforge::preview::{assemble, render_preview, DirectorySandbox};
use shopforge::provider::Gateway;
use shopforge::session::{Generator, SessionState};
use shopforge::store::{HandoffSlot, JsonFileRepository, PageRepository};
use shopforge::transcript::{self, TranscriptFlags};
use shopforge::wire::{DeviceClass, GenerationRequest, GenerationResult, HandoffPayload, PageVariant, SavedPageRecord};
use shopforge::{export, ux};

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// Loads the session, folding in a pending hand-off first.
fn load_session(data_dir: &Path) -> Result<SessionState> {
    let mut state = SessionState::load(data_dir)?;
    if let Some(payload) = HandoffSlot::new(data_dir).take()? {
        state.seed(payload);
        state.save(data_dir)?;
    }
    Ok(state)
}

fn repository(cfg: &Config) -> JsonFileRepository {
    JsonFileRepository::new(&cfg.data_path(), &cfg.store_namespace)
}

fn current_page(data_dir: &Path) -> Result<(GenerationRequest, GenerationResult)> {
    let state = load_session(data_dir)?;
    match (state.last_request, state.last_result) {
        (Some(req), Some(res)) => Ok((req, res)),
        _ => Err(anyhow!("no current page; run `shopforge generate` or `shopforge open <id>` first")),
    }
}

async fn run_generate(cfg: &Config, g: &GenerateArgs) -> Result<()> {
    let data_dir = cfg.data_path();
    let state = load_session(&data_dir)?;

    let variant = g
        .page_type
        .or_else(|| state.last_request.as_ref().map(|r| r.page_variant))
        .unwrap_or_default();
    let request = GenerationRequest::new(g.instruction_text(), variant)
        .with_preset(g.preset)
        .with_reference_url(g.reference_url.clone());

    let mut generator = Generator::new(Gateway::from_config(cfg), state);
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let pb = ux::spinner("Generating page...", g.progress);
    let outcome = generator.submit(request, g.refine_mode(), &cancel).await;
    pb.finish_and_clear();

    let outcome = outcome?;

    ux::show_outcome(&outcome);
    if let Some(prev) = outcome.previous.as_ref().filter(|_| outcome.is_refinement()) {
        let diff = ux::render_diff(prev.normalized_source_text(), outcome.result.normalized_source_text());
        if !diff.is_empty() {
            println!("{diff}");
        }
    }

    let flags = TranscriptFlags { save_request: g.save_request, save_response: g.save_response };
    if flags.any() {
        let saved = transcript::save_generation(&data_dir, Uuid::new_v4(), &outcome, flags)?;
        for line in transcript::describe(&saved) {
            println!("{line}");
        }
    }

    if let Some(dir) = &g.preview_dir {
        write_preview(dir, Some(outcome.result.normalized_source_text()), g.device)?;
    }

    generator.into_state().save(&data_dir)?;
    Ok(())
}

fn write_preview(dir: &Path, normalized: Option<&str>, device: DeviceClass) -> Result<()> {
    let files = assemble(normalized, device);
    let out = render_preview(&DirectorySandbox::new(dir), &files)?;
    println!("{} {}", "preview:".green().bold(), out.location);
    Ok(())
}

fn run_preview(cfg: &Config, p: &PreviewArgs) -> Result<()> {
    let normalized = match &p.from {
        Some(file) => Some(normalize(&fs_err::read_to_string(file)?)),
        None => load_session(&cfg.data_path())?
            .last_result
            .map(|r| r.normalized_source_text().to_string()),
    };
    write_preview(&p.out, normalized.as_deref(), p.device)
}

fn run_normalize(file: Option<&Path>) -> Result<()> {
    let raw = match file {
        Some(f) => fs_err::read_to_string(f)?,
        None => {
            let mut s = String::new();
            std::io::stdin().read_to_string(&mut s).context("failed to read stdin")?;
            s
        }
    };
    print!("{}", normalize(&raw));
    Ok(())
}

fn run_save(cfg: &Config) -> Result<()> {
    let (request, result) = current_page(&cfg.data_path())?;
    let record = SavedPageRecord::new(&request, &result, Utc::now().timestamp_millis());
    let id = record.id.clone();
    repository(cfg).append(record)?;
    println!("{} {}", "saved".green().bold(), id);
    Ok(())
}

fn find_page(cfg: &Config, id: &str) -> Result<SavedPageRecord> {
    repository(cfg).get(id)?.ok_or_else(|| anyhow!("no saved page with id {id}"))
}

fn run_list(cfg: &Config) -> Result<()> {
    ux::print_pages(&repository(cfg).all()?);
    Ok(())
}

fn run_show(cfg: &Config, id: &str, raw: bool) -> Result<()> {
    let page = find_page(cfg, id)?;
    if raw {
        println!("{}", page.source_text);
    } else {
        print!("{}", normalize(&page.source_text));
    }
    Ok(())
}

fn run_delete(cfg: &Config, id: &str, yes: bool) -> Result<()> {
    if !yes && !ux::confirm(&format!("Delete {id}?")) {
        return Ok(());
    }
    if repository(cfg).delete(id)? {
        println!("{} {id}", "deleted".red().bold());
    } else {
        println!("no saved page with id {id}");
    }
    Ok(())
}

/// Parks a saved page in the hand-off slot for the next generate/preview.
fn run_open(cfg: &Config, id: &str) -> Result<()> {
    let page = find_page(cfg, id)?;
    HandoffSlot::new(&cfg.data_path()).put(&HandoffPayload::from(&page))?;
    println!("{} {id}; the next generate/preview continues from it", "opened".green().bold());
    Ok(())
}

fn run_export(cfg: &Config, id: Option<&str>, out: &Path) -> Result<()> {
    let (normalized, variant): (String, PageVariant) = match id {
        Some(id) => {
            let page = find_page(cfg, id)?;
            (normalize(&page.source_text), page.page_variant)
        }
        None => {
            let (req, res) = current_page(&cfg.data_path())?;
            (res.normalized_source_text().to_string(), req.page_variant)
        }
    };
    let path = export::write_archive(out, &normalized, variant, Utc::now().timestamp_millis())?;
    println!("{} {}", "exported".green().bold(), path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let cwd = std::env::current_dir()?;
    let mut cfg = Config::load(args.config.as_deref(), &cwd)?;
    args.apply_overrides(&mut cfg);
    log::debug!("config: {cfg:?}");

    let result = match &args.command {
        Command::Generate(g) => run_generate(&cfg, g).await,
        Command::Preview(p) => run_preview(&cfg, p),
        Command::Normalize { file } => run_normalize(file.as_deref()),
        Command::Save => run_save(&cfg),
        Command::List => run_list(&cfg),
        Command::Show { id, raw } => run_show(&cfg, id, *raw),
        Command::Delete { id, yes } => run_delete(&cfg, id, *yes),
        Command::Open { id } => run_open(&cfg, id),
        Command::Export { id, out } => run_export(&cfg, id.as_deref(), out),
    };

    if let Err(e) = &result {
        if let Some(forge) = e.downcast_ref::<ForgeError>() {
            ux::print_error(forge);
            std::process::exit(1);
        }
    }
    result
}
