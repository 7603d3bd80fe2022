//! Command-line entry point for the deliberation engine.
//!
//! Loads a static config document, seeds a patient record from a JSON file,
//! and drives one `invoke()` call to completion, printing the final report.

use anyhow::{Context, Result};
use clap::Parser;
use mdt_deliberation::config::{Config, Provider};
use mdt_deliberation::inference::cloud::{CloudInferenceProvider, CloudVendor};
use mdt_deliberation::inference::InferenceProvider;
use mdt_deliberation::mdt::graph::Engine;
use mdt_deliberation::mdt::state::MainState;
use mdt_deliberation::patient::PatientRecord;
use mdt_deliberation::runners::{
    SimpleDialogueSummarizer, SimpleExpertRunner, SimpleSummarizerLlm, SimpleVerdictElicitor,
};
use mdt_deliberation::types::GroupId;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mdt-run")]
#[command(about = "Run the multi-agent deliberation engine once over a patient record")]
struct Cli {
    /// Path to the YAML configuration document.
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Path to a JSON-encoded PatientRecord.
    #[arg(short, long)]
    patient: PathBuf,

    /// Optional free-form summary-style directive for the final report.
    #[arg(long)]
    summary_style: Option<String>,
}

fn build_provider(agent: &mdt_deliberation::config::AgentConfig) -> Result<CloudInferenceProvider> {
    let provider = agent.provider().context("resolving provider")?;
    let vendor = match provider {
        Provider::Openai => CloudVendor::OpenAi,
        Provider::Anthropic => CloudVendor::Anthropic,
    };
    let env_var = match provider {
        Provider::Openai => "OPENAI_API_KEY",
        Provider::Anthropic => "ANTHROPIC_API_KEY",
    };
    let api_key = agent
        .api_key
        .clone()
        .or_else(|| std::env::var(env_var).ok())
        .with_context(|| format!("no API key for provider via {env_var}"))?;

    let mut cloud = CloudInferenceProvider::new(vendor, api_key);
    if let Some(base_url) = &agent.base_url {
        cloud = cloud.with_base_url(base_url.clone());
    }
    Ok(cloud)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load_from_file(&cli.config).context("loading config")?;
    info!(path = %cli.config.display(), "loaded configuration");

    let patient_json = std::fs::read_to_string(&cli.patient).context("reading patient record")?;
    let patient_record: PatientRecord =
        serde_json::from_str(&patient_json).context("parsing patient record")?;

    let group_ids: Vec<GroupId> = config
        .multi_expert_diagnosis_agent
        .groups
        .keys()
        .map(|k| GroupId::from(k.as_str()))
        .collect();

    let expert_providers: Vec<(GroupId, CloudInferenceProvider, String)> = group_ids
        .iter()
        .map(|group_id| {
            let group_config = config
                .group(group_id.as_str())
                .unwrap_or_else(|| panic!("config missing group {group_id}"));
            let provider = build_provider(&group_config.main_agent)?;
            Ok((group_id.clone(), provider, group_config.main_agent.model_name.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    // This minimal CLI demonstrates wiring for a single expert group; a
    // production deployment would dispatch per group_id to its own runner.
    let (first_group_id, first_provider, first_model) = expert_providers
        .into_iter()
        .next()
        .context("at least one expert group must be configured")?;
    let _ = first_group_id;

    let expert_runner = SimpleExpertRunner {
        provider: &first_provider as &dyn InferenceProvider,
        model: first_model.clone(),
    };
    let reviewer = SimpleVerdictElicitor {
        provider: &first_provider as &dyn InferenceProvider,
        model: first_model.clone(),
    };
    let dialogue_summarizer = SimpleDialogueSummarizer {
        provider: &first_provider as &dyn InferenceProvider,
        model: first_model.clone(),
    };

    let summary_provider = build_provider(&config.summary_agent)?;
    let summarizer_llm = SimpleSummarizerLlm {
        provider: &summary_provider as &dyn InferenceProvider,
        model: config.summary_agent.model_name.clone(),
    };

    let reviewer_prompt = std::fs::read_to_string(&config.mdt_config.reviewer_prompt_path)
        .context("reading reviewer prompt template")?;

    let engine = Engine {
        expert_runner: &expert_runner,
        reviewer: &reviewer,
        dialogue_summarizer: &dialogue_summarizer,
        summarizer_llm: &summarizer_llm,
        reviewer_prompt_template: &reviewer_prompt,
        summarizer_system_prompt: "Compose a structured clinical summary from the expert reports below.",
        group_ids: &group_ids,
        max_rounds: config.mdt_config.max_rounds,
    };

    let mut state = MainState::new(config.mdt_config.max_rounds);
    state.mdt.patient_record = patient_record;
    state.start_diagnosis = true;
    state.summary_style = cli.summary_style;

    let result = engine.invoke(state).await?;

    for message in result.mdt.journal.messages() {
        info!("{}", message.text);
    }

    println!("{}", result.final_report.unwrap_or_default());
    Ok(())
}
