use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use atelier::config::Config;
use atelier::generation::create_generation;
use atelier::models::{GenerationRequest, ImageFile, ModelTier, OutputFormat, QueueStatus, QueueUpdate};
use atelier::prompt::{InMemoryCatalog, PromptCatalog, PromptEntry, PromptInput, ResolvedTag};
use atelier::services::{
    smart_translate, ImagePipeline, MyMemoryTranslator, NoopTranslator, PipelineEvent, Translator,
};
use atelier::session::SessionStore;
use atelier::settings::DisplaySettings;
use atelier::storage::{create_storage, ObjectStorage};
use atelier::store::LocalStore;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(about = "Edit images with AI generation and reusable prompt tags")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Edit one or two images with a text prompt
    Generate(GenerateArgs),
    /// List catalog prompts available to the current user
    Prompts,
    /// Start a local session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// End the local session
    Logout,
}

#[derive(Args)]
struct GenerateArgs {
    /// Source image; repeat for a two-image composition
    #[arg(short, long = "image", required = true)]
    images: Vec<PathBuf>,

    /// Prompt text; ##XXXXXX markers attach catalog prompts
    #[arg(short, long)]
    prompt: String,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 28)]
    steps: u32,

    #[arg(long, default_value_t = 3.5)]
    guidance: f32,

    /// Output format: jpeg or png
    #[arg(long, default_value = "jpeg")]
    format: String,

    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Use the cheaper, faster single-image model
    #[arg(long)]
    fast: bool,

    /// Where to save the first output image (defaults to result.<ext>)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Generate(args) => generate(config, args).await,
        Command::Prompts => list_prompts(config),
        Command::Login { email, password } => login(config, &email, &password),
        Command::Logout => logout(config),
    }
}

async fn generate(config: Config, args: GenerateArgs) -> anyhow::Result<()> {
    if args.images.is_empty() || args.images.len() > 2 {
        bail!("provide one or two --image files");
    }
    let format: OutputFormat = args.format.parse()?;

    let store = LocalStore::open(&config.data_dir)?;
    let session = SessionStore::new(LocalStore::open(&config.data_dir)?);
    let settings = DisplaySettings::load(&store);
    let user = session.user_id();

    // Track catalog tags referenced by the prompt text.
    let catalog = Arc::new(InMemoryCatalog::seeded());
    let mut input = PromptInput::new(catalog, &user);
    let outcome = input.set_text(&args.prompt);
    for id in &outcome.invalid {
        tracing::warn!(tag = %id, "unknown prompt tag, ignoring");
    }
    for (id, resolution) in input.resolved_tags() {
        match resolution {
            ResolvedTag::Public { text } => tracing::info!(tag = %id, %text, "using catalog prompt"),
            ResolvedTag::Premium { cost } => {
                tracing::info!(tag = %id, cost, "using premium catalog prompt")
            }
            ResolvedTag::Restricted { accessible: true } => {
                tracing::info!(tag = %id, "using restricted catalog prompt")
            }
            ResolvedTag::Restricted { accessible: false } => {
                tracing::warn!(tag = %id, "restricted catalog prompt, no access")
            }
            ResolvedTag::Invalid => {}
        }
    }

    // Persian prompts go through translation before generation.
    let prompt = if config.translate.enabled {
        let translator = MyMemoryTranslator::new(&config.translate.base_url);
        translate_prompt(&translator, input.text()).await
    } else {
        translate_prompt(&NoopTranslator, input.text()).await
    };

    let files = args
        .images
        .iter()
        .map(ImageFile::from_path)
        .collect::<Result<Vec<_>, _>>()?;

    let storage: Arc<dyn ObjectStorage> = Arc::from(create_storage(&config.storage)?);
    let pipeline = if settings.announcements {
        let (pipeline, mut events) = ImagePipeline::with_events(config.pipeline.clone(), storage);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                report_progress(event);
            }
        });
        pipeline
    } else {
        ImagePipeline::new(config.pipeline.clone(), storage)
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let prepared = pipeline.prepare_all(&files, &cancel).await?;
    let image_refs = prepared.iter().map(|p| p.reference.clone()).collect();

    let mut request = GenerationRequest::new(prompt, image_refs);
    request.params.seed = args.seed;
    request.params.num_inference_steps = args.steps;
    request.params.guidance_scale = args.guidance;
    request.params.output_format = format;
    if args.aspect_ratio.is_some() {
        request.params.aspect_ratio = args.aspect_ratio.clone();
    }
    request.tier = if args.fast { ModelTier::Fast } else { ModelTier::Max };

    let (updates_tx, mut updates_rx) = tokio::sync::mpsc::unbounded_channel::<QueueUpdate>();
    tokio::spawn(async move {
        while let Some(update) = updates_rx.recv().await {
            match update.status {
                QueueStatus::InQueue => tracing::info!(request_id = %update.request_id, "queued"),
                QueueStatus::InProgress => {
                    tracing::info!(request_id = %update.request_id, "generating")
                }
                QueueStatus::Completed => {
                    tracing::info!(request_id = %update.request_id, "completed")
                }
            }
            for line in update.logs {
                tracing::debug!(log = %line, "service log");
            }
        }
    });

    let backend = create_generation(&config.generation, Some(updates_tx))?;
    let result = backend.generate(&request).await?;
    let asset = result
        .images
        .first()
        .context("generation returned no images")?;

    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(format!("result.{}", format.extension())));
    let bytes = download(&asset.url).await?;
    std::fs::write(&out, &bytes)
        .with_context(|| format!("failed to write {}", out.display()))?;

    if session.is_authenticated() {
        session.update_profile(|profile| profile.usage.images_created += 1)?;
    }

    println!("saved {} ({}x{})", out.display(), asset.width, asset.height);
    if let Some(seed) = result.seed {
        println!("seed: {seed}");
    }
    if let Some(request_id) = &result.request_id {
        println!("request: {request_id}");
    }
    Ok(())
}

async fn translate_prompt(translator: &dyn Translator, text: &str) -> String {
    let outcome = smart_translate(translator, text).await;
    if outcome.was_translated {
        tracing::info!(original = %outcome.original, translated = %outcome.text, "prompt translated");
    }
    outcome.text
}

fn report_progress(event: PipelineEvent) {
    match event {
        PipelineEvent::Validating { slot } => tracing::info!(slot, "validating image"),
        PipelineEvent::CompressionAttempt {
            slot,
            attempt,
            total,
            quality,
            size,
        } => tracing::info!(slot, attempt, total, quality, size, "compressing"),
        PipelineEvent::Compressed {
            slot,
            original_size,
            final_size,
            quality,
        } => tracing::info!(slot, original_size, final_size, quality, "compressed"),
        PipelineEvent::Uploading { slot } => tracing::info!(slot, "uploading"),
        PipelineEvent::Uploaded { slot, url } => tracing::info!(slot, %url, "uploaded"),
        PipelineEvent::FallingBack { slot, reason } => {
            tracing::warn!(slot, %reason, "falling back to inline embedding")
        }
    }
}

async fn download(url: &str) -> anyhow::Result<Vec<u8>> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

fn list_prompts(config: Config) -> anyhow::Result<()> {
    let session = SessionStore::new(LocalStore::open(&config.data_dir)?);
    let user = session.user_id();
    let catalog = InMemoryCatalog::seeded();

    for entry in catalog.accessible(&user) {
        println!("{}", describe(&entry));
    }
    Ok(())
}

fn describe(entry: &PromptEntry) -> String {
    if !entry.secret {
        format!("##{}  {}", entry.id, entry.text)
    } else if entry.private {
        format!("##{}  [restricted] by {}", entry.id, entry.creator)
    } else {
        format!("##{}  [premium, {} credits] by {}", entry.id, entry.cost, entry.creator)
    }
}

fn login(config: Config, email: &str, password: &str) -> anyhow::Result<()> {
    let session = SessionStore::new(LocalStore::open(&config.data_dir)?);
    let profile = session.login(email, password)?;
    println!("logged in as {} <{}>", profile.name, profile.email);
    Ok(())
}

fn logout(config: Config) -> anyhow::Result<()> {
    let session = SessionStore::new(LocalStore::open(&config.data_dir)?);
    session.logout()?;
    println!("logged out");
    Ok(())
}
