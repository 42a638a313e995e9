use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use settlement_assist::assistant::{
    AssistantDeps, AssistantEvent, AssistantOrchestrator, MemoryNavigator, PendingReply,
    TokioDelay,
};
use settlement_assist::chat::{Message, Sender};
use settlement_assist::config::{AssistantConfig, ENV_PREFIX};
use settlement_assist::error::Result;
use settlement_assist::flow::{FormData, Step};
use settlement_assist::responses::ScriptedResponder;
use settlement_assist::store::LibSqlStore;

const START_PATH: &str = "/calculator";

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, config_error) = match AssistantConfig::try_from_env() {
        Ok(config) => (config, None),
        Err(e) => (AssistantConfig::default(), Some(e)),
    };

    // The terminal is the chat surface, so logs go to a daily file
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "settlement-assist.log");
    let (log_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_writer)
        .init();

    if let Some(e) = config_error {
        tracing::warn!(error = %e, "Invalid assistant configuration, using defaults");
        eprintln!("Warning: {e}; using default configuration");
    }

    let session_id = session_from_args()
        .or_else(|| std::env::var(format!("{ENV_PREFIX}SESSION")).ok())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let store = open_store(&config)
        .await
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;

    eprintln!("💬 Settlement Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Session: {}", session_id);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Logs: {}", config.log_dir.display());
    eprintln!("   Type a message and press Enter. /help for commands, /quit to exit.\n");

    let deps = AssistantDeps {
        store: Arc::new(store),
        responder: Arc::new(ScriptedResponder::new()),
        delay: Arc::new(TokioDelay),
        navigator: Arc::new(MemoryNavigator::new(START_PATH)),
    };
    let assistant = AssistantOrchestrator::new(session_id, config, deps).await;

    let history = assistant.messages().await;
    if !history.is_empty() {
        eprintln!("   Restored {} messages:", history.len());
        for message in &history {
            print_message(message);
        }
    }

    let mut events = assistant.subscribe();
    let renderer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => render_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event renderer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    assistant.open_assistant().await;

    let mut pending: Vec<PendingReply> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        };
        pending.retain(|p| !p.is_finished());

        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }

        if line.starts_with('/') {
            match run_command(&assistant, line, &mut pending).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => eprintln!("Error: {e}"),
            }
            eprint!("> ");
        } else if let Some(reply) = assistant.send_message(line).await {
            pending.push(reply);
        }
    }

    // Let in-flight replies land so they are persisted
    for reply in pending {
        reply.finished().await;
    }
    drop(assistant);
    renderer.abort();
    eprintln!("Goodbye.");
    Ok(())
}

async fn open_store(config: &AssistantConfig) -> Result<LibSqlStore> {
    Ok(LibSqlStore::new_local(&config.db_path).await?)
}

fn session_from_args() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--session" {
            return args.next();
        }
        if let Some(value) = arg.strip_prefix("--session=") {
            return Some(value.to_string());
        }
    }
    None
}

async fn run_command(
    assistant: &AssistantOrchestrator,
    line: &str,
    pending: &mut Vec<PendingReply>,
) -> Result<Flow> {
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" | "/exit" => return Ok(Flow::Quit),
        "/help" => print_help(),
        "/open" => assistant.open_assistant().await,
        "/close" => assistant.close_assistant().await,
        "/step" if arg.is_empty() || arg == "none" => assistant.set_current_step(None).await,
        "/step" => {
            let step: Step = arg.parse()?;
            assistant.set_current_step(Some(step)).await;
        }
        "/form" => {
            let value: serde_json::Value = serde_json::from_str(arg)?;
            assistant.update_form_data(FormData::new(value)).await;
        }
        "/choice" if arg.is_empty() => eprintln!("Usage: /choice <text>"),
        "/choice" => assistant.add_user_choice(arg, None).await,
        "/ask" => {
            if let Some(reply) = assistant.send_contextual_message(arg).await {
                pending.push(reply);
            }
        }
        "/announce" => assistant.announce_step_change().await,
        "/welcome" => {
            if !assistant.show_welcome_message().await {
                eprintln!("(no welcome message for the current step)");
            }
        }
        "/guide" => println!("\n{}\n", assistant.step_guidance().await),
        "/summary" => println!("\n{}\n", assistant.summary_for_handoff().await),
        "/clear" => assistant.clear_messages().await,
        "/selftest" => pending.push(assistant.test_error_handling().await),
        "/handoff" => pending.push(assistant.handoff_to_main_chat().await),
        other => eprintln!("Unknown command: {other} (try /help)"),
    }
    Ok(Flow::Continue)
}

fn print_help() {
    eprintln!("Commands:");
    eprintln!("  /open, /close        show or hide the assistant panel");
    eprintln!("  /step <name>         set the calculator step (e.g. guaranteed_payment)");
    eprintln!("  /form <json>         replace the calculator form data");
    eprintln!("  /choice <text>       record a calculator choice");
    eprintln!("  /ask <text>          ask with the current calculator context");
    eprintln!("  /announce            describe the current step");
    eprintln!("  /welcome             greet for the current step");
    eprintln!("  /guide               print guidance for the current step");
    eprintln!("  /summary             print the handoff summary");
    eprintln!("  /clear               forget this conversation");
    eprintln!("  /selftest            post a test error message");
    eprintln!("  /handoff             hand the conversation to the main chat");
    eprintln!("  /quit                exit");
}

fn print_message(message: &Message) {
    let label = match message.sender {
        Sender::User => "you",
        Sender::Assistant if message.metadata.is_error => "assistant (error)",
        Sender::Assistant => "assistant",
        Sender::System => "system",
    };
    println!("[{label}] {}", message.text);
}

fn render_event(event: &AssistantEvent) {
    match event {
        // User lines are already on screen
        AssistantEvent::MessageAdded(message) if message.sender == Sender::User => {
            if message.metadata.choice.is_some() {
                print_message(message);
            }
        }
        AssistantEvent::MessageAdded(message) => {
            println!();
            print_message(message);
            eprint!("> ");
        }
        AssistantEvent::TypingChanged(true) => eprintln!("   (assistant is typing...)"),
        AssistantEvent::TypingChanged(false) => {}
        AssistantEvent::PanelToggled(open) => {
            eprintln!("   (assistant panel {})", if *open { "opened" } else { "closed" });
        }
        AssistantEvent::StepChanged(Some(step)) => {
            let position = step.position();
            eprintln!(
                "   (step {} of {}: {})",
                position.number, position.total, position.name
            );
        }
        AssistantEvent::StepChanged(None) => eprintln!("   (no current step)"),
        AssistantEvent::FormUpdated => eprintln!("   (form data updated)"),
        AssistantEvent::MessagesCleared => eprintln!("   (conversation cleared)"),
        AssistantEvent::HandoffStarted(record) => {
            eprintln!("   (handoff record written from {:?})", record.from_step);
        }
        AssistantEvent::Navigated { destination, kind } => {
            eprintln!("   (navigated via {kind:?} to {destination})");
        }
    }
}
