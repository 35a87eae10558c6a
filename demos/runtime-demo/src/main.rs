//! Assembles a runtime session from settings, prints the tool set, and
//! optionally sends one prompt through the profile's model.

use std::path::PathBuf;
use std::sync::Arc;

use agent_toolkit::adapters::{MessageRole, PromptMessage, ProviderRegistry};
use agent_toolkit::config::RuntimeSettings;
use agent_toolkit::profiles::{AgentBlueprint, ProfileRegistry};
use agent_toolkit::runtime::{RuntimeSession, SessionBootstrap};
use agent_toolkit::telemetry::init_tracing;
use agent_toolkit::tools::ToolPluginRegistry;
use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(about = "Assemble an agent runtime session and inspect its tools")]
struct Args {
    /// JSON settings file; `AGENT_*` variables override it.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// JSON file with extra profiles (an array or `{ "profiles": [...] }`).
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Prompt to send through the session's model.
    #[arg(long)]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let settings = RuntimeSettings::load(args.settings.as_deref())?;
    let plugins = Arc::new(ToolPluginRegistry::new());
    let runtime = settings.build_runtime(plugins)?;

    let mut session = runtime.assemble(settings.runtime_options()).await?;
    print_tools(&session);

    let outcome = match &args.prompt {
        Some(prompt) => ask(&settings, &session, args.profiles.as_ref(), prompt).await,
        None => Ok(()),
    };

    let disposal = session.close().await;
    if !disposal.is_clean() {
        warn!(failures = disposal.failures.len(), "some resources failed to close");
    }
    outcome
}

fn print_tools(session: &RuntimeSession) {
    info!(session_id = %session.id(), target = %session.target(), "session ready");
    for suite in session.tools().suites() {
        println!("{} - {}", suite.id(), suite.description());
        for tool in suite.list() {
            println!("    {:<18} {}", tool.name(), tool.description());
        }
    }
    for failure in &session.report().failures {
        println!("! {} `{}` left out: {}", failure.source, failure.id, failure.message);
    }
}

fn profiles(extra: Option<&PathBuf>) -> Result<ProfileRegistry> {
    let registry = ProfileRegistry::new();
    registry.register(
        AgentBlueprint::builder("default")
            .system_prompt("You are a careful assistant with access to local tools.")
            .provider("ollama")
            .model("llama3.2")
            .build()?,
    )?;

    if let Some(path) = extra {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading profiles from {}", path.display()))?;
        let added = registry.register_json(&text)?;
        info!(added, "extra profiles registered");
    }
    Ok(registry)
}

async fn ask(
    settings: &RuntimeSettings,
    session: &RuntimeSession,
    extra_profiles: Option<&PathBuf>,
    prompt: &str,
) -> Result<()> {
    let bootstrap = SessionBootstrap::new(
        Arc::new(profiles(extra_profiles)?),
        Arc::new(ProviderRegistry::with_builtin_providers()?),
    );
    let model = bootstrap.resolve(session.context().profile(), &settings.model_overrides())?;

    let request = model
        .request(vec![PromptMessage::new(MessageRole::User, prompt)])?
        .with_tools(session.tools().declarations());

    let mut stream = model.client().infer(request).await?;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        print!("{}", chunk.delta);
        for call in &chunk.tool_calls {
            match session.tools().invoke_call(call).await {
                Ok(output) => println!("\n[{}] {output}", call.name),
                Err(err) => println!("\n[{}] failed: {err}", call.name),
            }
        }
        if chunk.done {
            break;
        }
    }
    println!();
    Ok(())
}
