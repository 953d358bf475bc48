mod driver;
mod parse;
mod prompt;
mod render;

use clap::{Parser, Subcommand, ValueEnum};
use driver::Conversation;
use prompt::{ApprovalPrompt, AutoApprovePrompt, ConsolePrompt, QueuePrompt, parse_scripted_answer};
use render::RendererSet;
use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tally_agent::{
    AgentConfig, AgentError, DEFAULT_RATE_API_BASE_URL, EventEmitter, EventKind, HttpRateSource,
    SessionEvent, ToolContext, build_report_tool_registry,
};
use tally_controller::{RunController, RunOutcome};
use tally_llm::{Client, OpenRouterFactory, register_provider_factory};
use tally_threadstore::{FsThreadStore, ThreadStore};

#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Human-gated report agent: converse, approve tool calls, get reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive chat with the report agent.
    Chat(ChatArgs),
    /// Run the HTTP surface.
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug)]
struct ChatArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(long, value_enum, default_value_t = ApprovalMode::Auto)]
    approval: ApprovalMode,
    /// Scripted decisions for --approval queue: approve | reject | edit:{json}
    #[arg(long = "answer")]
    answers: Vec<String>,
    /// Print run and tool events to stderr.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,
}

#[derive(clap::Args, Debug)]
struct CommonArgs {
    /// Agent data directory (memories, thread store).
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Model identifier, e.g. openai/gpt-5-nano.
    #[arg(long)]
    model: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ApprovalMode {
    Auto,
    Console,
    Queue,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Chat(args) => chat_command(args).await,
        Commands::Serve(args) => serve_command(args).await,
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

struct StderrEventEmitter;

impl EventEmitter for StderrEventEmitter {
    fn emit(&self, event: SessionEvent) -> Result<(), AgentError> {
        let label = match &event.kind {
            EventKind::ToolCallStart => event
                .data
                .get("tool_name")
                .and_then(serde_json::Value::as_str)
                .map(|name| format!("tool {name} started"))
                .unwrap_or_else(|| "tool started".to_string()),
            EventKind::ToolCallEnd => format!(
                "tool call finished (error: {})",
                event
                    .data
                    .get("is_error")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false)
            ),
            other => format!("{other:?}"),
        };
        eprintln!("[event thread={}] {label}", event.thread_id);
        Ok(())
    }
}

fn build_controller(common: &CommonArgs, verbose: bool) -> Result<Arc<RunController>, String> {
    register_provider_factory(Arc::new(OpenRouterFactory));
    let client = Client::from_env().map_err(|error| error.to_string())?;
    if client.default_provider().is_none() {
        return Err(
            "no provider configured; set OPENROUTER_API_KEY (see .env support)".to_string(),
        );
    }

    let data_dir = common
        .data_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(".tally"));
    let store = Arc::new(
        FsThreadStore::new(data_dir.join("threads")).map_err(|error| error.to_string())?,
    );

    let rate_api_url = std::env::var("TALLY_RATE_API_URL")
        .unwrap_or_else(|_| DEFAULT_RATE_API_BASE_URL.to_string());
    let tool_context = Arc::new(ToolContext::new(
        Box::new(HttpRateSource::new(rate_api_url)),
        data_dir,
    ));

    let mut config = AgentConfig::default();
    if let Some(model) = common
        .model
        .clone()
        .or_else(|| std::env::var("TALLY_MODEL").ok())
    {
        config.model = model;
    }

    report_restorable_threads(&store);

    let mut controller = RunController::new(
        Arc::new(client),
        Arc::new(build_report_tool_registry()),
        tool_context,
        config,
        store,
    );
    if verbose {
        controller = controller.with_event_emitter(Arc::new(StderrEventEmitter));
    }
    Ok(Arc::new(controller))
}

fn report_restorable_threads(store: &Arc<FsThreadStore>) {
    let store = store.clone();
    tokio::task::spawn(async move {
        if let Ok(interrupted) = store.list_interrupted().await {
            if !interrupted.is_empty() {
                eprintln!(
                    "{} interrupted thread(s) restored and awaiting a decision: {}",
                    interrupted.len(),
                    interrupted.join(", ")
                );
            }
        }
    });
}

async fn chat_command(args: ChatArgs) -> Result<ExitCode, String> {
    let controller = build_controller(&args.common, args.verbose)?;
    let renderers = Arc::new(RendererSet::default());
    let approval = build_approval_prompt(args.approval, args.answers, renderers.clone())?;

    let mut conversation = Conversation::new(controller);
    eprintln!("tally chat - describe the items to report on (empty line to quit)");

    loop {
        let Some(line) = read_line("you> ").await else {
            break;
        };
        if line.is_empty() || line == "quit" || line == "exit" {
            break;
        }

        let mut outcome = match conversation.send(&line).await {
            Ok(outcome) => outcome,
            Err(error) => {
                eprintln!("error: {error}");
                continue;
            }
        };

        loop {
            match outcome {
                RunOutcome::Completed { report, .. } => {
                    println!("{report}");
                    break;
                }
                RunOutcome::Failed { error, .. } => {
                    eprintln!("run failed: {error}");
                    break;
                }
                RunOutcome::Interrupted {
                    action_requests, ..
                } => {
                    // Exactly the first pending action is offered; the rest
                    // re-surface on the next interrupt.
                    let Some(request) = action_requests.into_iter().next() else {
                        eprintln!("error: interrupt carried no action requests");
                        break;
                    };
                    eprintln!("{}", renderers.for_tool(&request.name).render(&request));
                    let decision = approval.decide(&request).await;
                    eprintln!("decision: {}", decision.kind());
                    match conversation.decide(decision).await {
                        Some(Ok(next)) => outcome = next,
                        Some(Err(error)) => {
                            eprintln!("error: {error}");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn serve_command(args: ServeArgs) -> Result<ExitCode, String> {
    let controller = build_controller(&args.common, false)?;
    eprintln!("tally server listening on http://{}", args.bind);
    tally_server::serve(controller, args.bind)
        .await
        .map_err(|error| error.to_string())?;
    Ok(ExitCode::SUCCESS)
}

fn build_approval_prompt(
    mode: ApprovalMode,
    answers: Vec<String>,
    renderers: Arc<RendererSet>,
) -> Result<Arc<dyn ApprovalPrompt>, String> {
    let prompt: Arc<dyn ApprovalPrompt> = match mode {
        ApprovalMode::Auto => {
            if is_interactive_terminal() {
                Arc::new(ConsolePrompt::new(renderers))
            } else {
                Arc::new(AutoApprovePrompt)
            }
        }
        ApprovalMode::Console => Arc::new(ConsolePrompt::new(renderers)),
        ApprovalMode::Queue => {
            let decisions = answers
                .iter()
                .map(|raw| {
                    parse_scripted_answer(raw)
                        .ok_or_else(|| format!("unparseable --answer value '{raw}'"))
                })
                .collect::<Result<Vec<_>, String>>()?;
            Arc::new(QueuePrompt::with_decisions(decisions))
        }
    };
    Ok(prompt)
}

async fn read_line(prompt_text: &str) -> Option<String> {
    let prompt_text = prompt_text.to_string();
    tokio::task::spawn_blocking(move || {
        use std::io::Write;
        let mut stdout = std::io::stdout();
        write!(stdout, "{prompt_text}").ok()?;
        stdout.flush().ok()?;
        let mut raw = String::new();
        std::io::stdin().read_line(&mut raw).ok()?;
        Some(raw.trim().to_string())
    })
    .await
    .ok()
    .flatten()
}

fn is_interactive_terminal() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}
