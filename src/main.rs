//! Interactive terminal client for the assessment engine.
//!
//! Usage: `diagnosis-chat [user_id] [element_id]`
//!
//! Type an answer, or a number to pick one of the offered options. Commands:
//! `/undo [n]`, `/progress`, `/options`, `/history`, `/complete [force]`,
//! `/quit`.

use std::error::Error;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use diagnosis_chat::application::conversation::{
    ConversationError, ConversationService, ConversationTurn,
};
use diagnosis_chat::config::{AppConfig, LogConfig};
use diagnosis_chat::container::ServiceContainer;
use diagnosis_chat::domain::foundation::UserId;

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

enum Command {
    Answer(String),
    Undo(u32),
    Progress,
    Options,
    History,
    Complete { force: bool },
    Quit,
    Unknown(String),
}

fn parse_command(line: &str, options: &[String]) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        // A bare number picks an offered option.
        return match line.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => Command::Answer(options[n - 1].clone()),
            _ => Command::Answer(line.to_string()),
        };
    };

    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("undo"), steps) => Command::Undo(steps.and_then(|s| s.parse().ok()).unwrap_or(1)),
        (Some("progress"), _) => Command::Progress,
        (Some("options"), _) => Command::Options,
        (Some("history"), _) => Command::History,
        (Some("complete"), flag) => Command::Complete {
            force: flag == Some("force"),
        },
        (Some("quit") | Some("exit"), _) => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

fn print_turn(turn: &ConversationTurn) -> Vec<String> {
    match turn {
        ConversationTurn::Question(q) => {
            if q.is_element_switching {
                println!("\n--- Next element ---");
            }
            if let Some(dc) = &q.data_collection {
                println!(
                    "[set {}/{} | question {}/{} | {}]",
                    dc.current_set, dc.total_sets, dc.question_in_set, dc.questions_per_set, dc.element_name
                );
            }
            println!(
                "\n({}/{}) {}",
                q.progress.question_number, q.progress.total_questions, q.question
            );
            for (i, option) in q.options.iter().enumerate() {
                println!("  {}. {}", i + 1, option);
            }
            q.options.clone()
        }
        ConversationTurn::Diagnosis(d) => {
            println!("\n{}", d.message);
            println!("Use /complete to close the session.");
            Vec::new()
        }
    }
}

fn print_error(err: &ConversationError) {
    match serde_json::to_string_pretty(&err.to_response()) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("error: {}", err),
    }
}

async fn run(service: &ConversationService, user_id: &UserId, element_id: Option<i64>) -> Result<(), Box<dyn Error>> {
    let mut options = match service.start_conversation(user_id, element_id).await {
        Ok(turn) => print_turn(&turn),
        Err(err) => {
            print_error(&err);
            return Ok(());
        }
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line, &options) {
            Command::Answer(answer) => match service.process_user_response(&answer, user_id).await {
                Ok(turn) => options = print_turn(&turn),
                Err(err) => print_error(&err),
            },
            Command::Undo(steps) => match service.undo_last_answer(user_id, steps).await {
                Ok(summary) => {
                    println!("Undid {} step(s).", summary.steps_undone);
                    if let Some(question) = summary.pending_question {
                        println!("\n{}", question);
                    }
                    options = Vec::new();
                }
                Err(err) => print_error(&err),
            },
            Command::Progress => match service.get_conversation_progress(user_id).await {
                Ok(view) => println!("{}", serde_json::to_string_pretty(&view)?),
                Err(err) => print_error(&err),
            },
            Command::Options => match service.get_answer_options(user_id).await {
                Ok(view) => {
                    options = view.data().cloned().unwrap_or_default();
                    for (i, option) in options.iter().enumerate() {
                        println!("  {}. {}", i + 1, option);
                    }
                }
                Err(err) => print_error(&err),
            },
            Command::History => match service.get_conversation_history(user_id).await {
                Ok(view) => {
                    for message in view.data().map(Vec::as_slice).unwrap_or_default() {
                        println!("{:?}: {}", message.role, message.content);
                    }
                }
                Err(err) => print_error(&err),
            },
            Command::Complete { force } => match service.complete_assessment(user_id, force).await {
                Ok(summary) => {
                    println!(
                        "Assessment completed with {} answered question(s).",
                        summary.total_questions_answered
                    );
                    break;
                }
                Err(err) => print_error(&err),
            },
            Command::Quit => break,
            Command::Unknown(input) => println!("Unknown command: {}", input),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.log);

    let mut args = std::env::args().skip(1);
    let user_id = UserId::new(args.next().unwrap_or_else(|| "guest".to_string()))?;
    let element_id = args.next().and_then(|s| s.parse::<i64>().ok());

    let container = ServiceContainer::from_config(&config).await?;
    tracing::info!(user_id = %user_id, "Starting interactive session");

    run(&container.service(), &user_id, element_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> Vec<String> {
        vec!["alpha".to_string(), "beta".to_string()]
    }

    #[test]
    fn number_selects_option() {
        assert!(matches!(parse_command("2", &opts()), Command::Answer(a) if a == "beta"));
        assert!(matches!(parse_command("7", &opts()), Command::Answer(a) if a == "7"));
    }

    #[test]
    fn parses_commands() {
        assert!(matches!(parse_command("/undo", &opts()), Command::Undo(1)));
        assert!(matches!(parse_command("/undo 3", &opts()), Command::Undo(3)));
        assert!(matches!(
            parse_command("/complete force", &opts()),
            Command::Complete { force: true }
        ));
        assert!(matches!(parse_command("/quit", &opts()), Command::Quit));
        assert!(matches!(parse_command("/dance", &opts()), Command::Unknown(_)));
    }
}
