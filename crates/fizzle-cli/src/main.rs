//! `fizzle`: scene documents and AI design generation from a terminal.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fizzle_ai::{AiError, ApiConfig, ChatClient};
use fizzle_core::document::{export_project_json, parse_document};
use fizzle_core::presets::{StageCategory, parse_stage, stages_in};
use fizzle_core::{
    ApplyOptions, CoreError, ExportOptions, ObjectKind, OffsetDateTime, SceneDocument,
    export_pure_json, fit_preview, render_svg,
};
use fizzle_editor::{Conversation, ConversationError, Editor};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Document(#[from] CoreError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Conversation(#[from] ConversationError),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid size `{0}`; expected WIDTHxHEIGHT or a stage preset name")]
    InvalidSize(String),
}

#[derive(Parser, Debug)]
#[command(name = "fizzle", about = "Fizzle scene documents and AI design tools")]
struct Cli {
    /// Design API root; overrides FIZZLE_API_ROOT.
    #[arg(long, global = true)]
    api_root: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a scene document.
    Inspect { file: PathBuf },
    /// Normalize any accepted document shape into a project file.
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Write the bare canvas form instead of the wrapped project file.
        #[arg(long)]
        pure: bool,
    },
    /// Render a document to SVG.
    Svg {
        input: PathBuf,
        output: PathBuf,
        /// Fit into a thumbnail, e.g. `200x150`.
        #[arg(long)]
        preview: Option<String>,
    },
    /// Ask the design assistant, streaming its reply.
    Chat {
        prompt: String,
        /// Current design, sent along as canvas context.
        #[arg(long)]
        design: Option<PathBuf>,
        /// Accept the proposed design and write the result here.
        #[arg(long)]
        apply: Option<PathBuf>,
    },
    /// One-shot generation from a description.
    Generate {
        description: String,
        #[arg(long)]
        out: PathBuf,
    },
    /// List the stage size presets.
    Stages,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect { file } => {
            let scene = load_scene(&file)?;
            print!("{}", summarize(&scene));
            Ok(())
        }
        Command::Convert {
            input,
            output,
            pure,
        } => {
            let scene = load_scene(&input)?;
            let opts = ExportOptions::default();
            let json = if pure {
                export_pure_json(&scene, opts)?
            } else {
                export_project_json(&scene, opts, OffsetDateTime::now_utc())?
            };
            write_file(&output, &json)
        }
        Command::Svg {
            input,
            output,
            preview,
        } => {
            let mut scene = load_scene(&input)?;
            if let Some(size) = preview {
                let (width, height) = parse_stage(&size).ok_or(CliError::InvalidSize(size))?;
                scene = fit_preview(&scene, width, height);
            }
            write_file(&output, &render_svg(&scene))
        }
        Command::Chat {
            prompt,
            design,
            apply,
        } => {
            let config = api_config(cli.api_root.as_deref())?;
            run_chat(config, &prompt, design.as_deref(), apply.as_deref()).await
        }
        Command::Generate { description, out } => {
            let config = api_config(cli.api_root.as_deref())?;
            run_generate(config, &description, &out).await
        }
        Command::Stages => {
            print!("{}", list_stages());
            Ok(())
        }
    }
}

fn api_config(api_root: Option<&str>) -> Result<ApiConfig, CliError> {
    let config = ApiConfig::from_env()?;
    Ok(match api_root {
        Some(root) => config.with_api_root(root)?,
        None => config,
    })
}

async fn run_chat(
    config: ApiConfig,
    prompt: &str,
    design: Option<&Path>,
    apply: Option<&Path>,
) -> Result<(), CliError> {
    let at = OffsetDateTime::now_utc();
    let mut editor = Editor::default();
    if let Some(path) = design {
        editor.import_json(&read_file(path)?, ApplyOptions::default(), at)?;
    }
    let context: Value = serde_json::from_str(&editor.export_pure(ExportOptions::default())?)?;

    let mut chat = Conversation::new();
    let (ticket, wire) = chat.begin_request(prompt, Some(&context));
    let client = ChatClient::new(config)?;

    let (abort, registration) = ChatClient::abort_pair();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });

    let mut progress = io::stderr();
    let result = client
        .stream_chat(&wire, registration, |fragment| {
            chat.push_fragment(ticket, fragment);
            let _ = write!(progress, "{fragment}");
            let _ = progress.flush();
        })
        .await;
    interrupt.abort();
    eprintln!();

    let reply = match result {
        Ok(reply) => reply,
        Err(AiError::Cancelled) => {
            chat.cancel(ticket);
            eprintln!("cancelled");
            return Ok(());
        }
        Err(e) => {
            chat.fail(ticket);
            return Err(e.into());
        }
    };
    if let Some(reasoning) = &reply.reasoning {
        eprintln!("reasoning: {reasoning}");
    }
    println!("{}", reply.answer);

    let Some(id) = chat.complete(ticket, reply) else {
        return Ok(());
    };
    let has_design = chat.get(id).is_some_and(|m| m.design_preview.is_some());
    match (apply, has_design) {
        (Some(out), true) => {
            let (document, prompt) = chat.accept(id)?;
            let design_id = editor.accept_design(document, &prompt, at)?;
            log::info!("accepted design {design_id}");
            write_file(out, &editor.export_json(ExportOptions::default(), at)?)
        }
        (Some(_), false) => {
            eprintln!("the reply carried no design; nothing written");
            Ok(())
        }
        (None, true) => {
            eprintln!("a design was proposed; pass --apply <file> to save it");
            Ok(())
        }
        (None, false) => Ok(()),
    }
}

async fn run_generate(config: ApiConfig, description: &str, out: &Path) -> Result<(), CliError> {
    let client = ChatClient::new(config)?;
    let design = client.generate(description).await?;
    let at = OffsetDateTime::now_utc();
    let mut editor = Editor::default();
    let change = editor.apply_document(design, ApplyOptions::default(), at)?;
    eprintln!("{} objects generated", change.objects_added);
    write_file(out, &editor.export_json(ExportOptions::default(), at)?)
}

fn load_scene(path: &Path) -> Result<SceneDocument, CliError> {
    let text = read_file(path)?;
    Ok(parse_document(&text, OffsetDateTime::now_utc())?
        .canvas
        .into_scene()?)
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn summarize(scene: &SceneDocument) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "name:       {}", scene.name);
    let _ = writeln!(out, "canvas:     {} x {}", scene.width, scene.height);
    let background = scene
        .background
        .color
        .as_ref()
        .and_then(|paint| paint.css())
        .unwrap_or_else(|| "none".to_string());
    let _ = writeln!(out, "background: {background}");
    if let Some(image) = &scene.background.image {
        let _ = writeln!(out, "bg image:   {} ({:?})", image.src, image.fit);
    }
    let _ = writeln!(out, "objects:    {}", scene.objects.len());

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for object in &scene.objects {
        *counts.entry(object.kind.type_name()).or_default() += 1;
    }
    for (kind, count) in counts {
        let _ = writeln!(out, "  {kind:<10} {count}");
    }

    let unsupported = scene
        .objects
        .iter()
        .filter(|o| matches!(o.kind, ObjectKind::Unsupported { .. }))
        .count();
    if unsupported > 0 {
        let _ = writeln!(out, "unsupported: {unsupported} (kept as-is, drawn as placeholders)");
    }
    let locked = scene.objects.iter().filter(|o| o.is_locked()).count();
    if locked > 0 {
        let _ = writeln!(out, "locked:     {locked}");
    }
    out
}

fn list_stages() -> String {
    let mut out = String::new();
    for category in [
        StageCategory::SocialMedia,
        StageCategory::Print,
        StageCategory::Digital,
        StageCategory::Custom,
    ] {
        let _ = writeln!(out, "{}", category.label());
        for stage in stages_in(category) {
            let _ = writeln!(out, "  {:<22} {} x {}", stage.name, stage.width, stage.height);
        }
    }
    out
}
