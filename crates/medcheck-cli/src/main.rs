use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medcheck_core::{
    PatientContext, PatientProfile, Pipeline, PipelineConfig, PubChemResolver,
    SqliteInteractionStore,
};
use medcheck_llm::{GeneratorConfig, LlmExtractor, LlmSynthesizer, Provider};

#[derive(Parser)]
#[command(name = "medcheck")]
#[command(about = "Check a patient's medications for known drug interactions")]
struct Cli {
    /// Patient profile JSON (age, sex, height, weight, allergies, medications, ...)
    #[arg(long)]
    profile: PathBuf,

    /// The patient's question
    #[arg(long)]
    question: String,

    /// Plain-text documents to attach to the profile
    #[arg(long, num_args = 1..)]
    documents: Vec<PathBuf>,

    /// Interaction database (overrides MEDCHECK_DATABASE)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Text generation provider: gemini or ollama (overrides MEDCHECK_LLM_PROVIDER)
    #[arg(long)]
    provider: Option<Provider>,

    /// Model name (overrides MEDCHECK_LLM_MODEL)
    #[arg(long)]
    model: Option<String>,
}

/// Read the profile and attach document text.
fn load_context(cli: &Cli) -> anyhow::Result<PatientContext> {
    let raw = fs::read_to_string(&cli.profile)
        .with_context(|| format!("reading profile {}", cli.profile.display()))?;
    let mut profile: PatientProfile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing profile {}", cli.profile.display()))?;

    let mut documents = Vec::new();
    if !profile.user_document_data.trim().is_empty() {
        documents.push(profile.user_document_data.clone());
    }
    for path in &cli.documents {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading document {}", path.display()))?;
        documents.push(text);
    }
    profile.user_document_data = documents.join("\n");

    Ok(PatientContext::try_from(profile)?)
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs on stderr; stdout carries the JSON result.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("medcheck=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let context = load_context(&cli)?;

    let mut config = PipelineConfig::from_env()?;
    if let Some(path) = &cli.database {
        config = config.with_database_path(path.clone())?;
    }

    let mut llm_config = GeneratorConfig::from_env()?;
    if let Some(provider) = cli.provider {
        llm_config = llm_config.with_provider(provider);
    }
    if let Some(model) = &cli.model {
        llm_config = llm_config.with_model(model.clone());
    }

    let store = SqliteInteractionStore::open(config.database_path(), config.store_busy_timeout())
        .with_context(|| format!("opening interaction database {}", config.database_path().display()))?;
    let resolver = PubChemResolver::new(config.pubchem_base_url(), config.resolver_timeout_secs())?;
    let generator = llm_config.connect()?;
    let extractor = LlmExtractor::new(&generator);
    let synthesizer = LlmSynthesizer::new(&generator);

    tracing::info!(
        database = %config.database_path().display(),
        provider = %llm_config.provider(),
        model = llm_config.model(),
        "++ Starting medcheck"
    );

    let result = Pipeline::new(&extractor, &resolver, &store, &synthesizer)
        .with_max_resolver_workers(config.max_resolver_workers())
        .run(&context, &cli.question);

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_done() {
        std::process::exit(1);
    }
    Ok(())
}
