//! echo-client: command-line client for the echo agent
//!
//! Talks to the server's skill endpoint and prints the JSON it returns.
//! Histories are shown most recent first; the server keeps them oldest first.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "echo-client")]
#[command(about = "Client for the echo agent", long_about = None)]
struct Cli {
    /// Server base URL
    #[arg(long, env = "ECHO_AGENT_URL", default_value = "http://127.0.0.1:32769")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Echo a message (a new thread id is generated if omitted)
    Echo {
        #[arg(short, long)]
        thread_id: Option<String>,
        /// Message words, joined with spaces
        message: Vec<String>,
    },
    /// Show the conversation history
    History {
        #[arg(short, long)]
        thread_id: String,
    },
    /// Delete the conversation history
    DeleteHistory {
        #[arg(short, long)]
        thread_id: String,
    },
    /// Cancel the conversation
    Cancel {
        #[arg(short, long)]
        thread_id: String,
    },
}

impl Commands {
    fn into_request(self) -> Value {
        match self {
            Commands::Echo { thread_id, message } => {
                let thread_id = thread_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                let input = (!message.is_empty()).then(|| message.join(" "));
                json!({
                    "skill": "echo",
                    "data": { "thread_id": thread_id, "user_input": input },
                })
            }
            Commands::History { thread_id } => skill("history", &thread_id),
            Commands::DeleteHistory { thread_id } => skill("delete_history", &thread_id),
            Commands::Cancel { thread_id } => skill("cancel", &thread_id),
        }
    }
}

fn skill(name: &str, thread_id: &str) -> Value {
    json!({ "skill": name, "data": { "thread_id": thread_id } })
}

/// Reorder histories in a response to most recent first
fn newest_first(mut response: Value) -> Value {
    if let Some(result) = response.get_mut("result") {
        if let Some(past) = result.get_mut("past").and_then(Value::as_array_mut) {
            past.reverse();
        } else if let Some(history) = result.as_array_mut() {
            history.reverse();
        }
    }
    response
}

fn send(base_url: &str, request: &Value) -> Result<Value, String> {
    let url = format!("{}/api/skills", base_url.trim_end_matches('/'));

    match ureq::post(&url).send_json(request) {
        Ok(response) => response
            .into_json()
            .map_err(|e| format!("Invalid response from server: {e}")),
        Err(ureq::Error::Status(code, response)) => {
            let body: Value = response.into_json().unwrap_or(Value::Null);
            let message = body["error"].as_str().unwrap_or("request failed");
            Err(format!("Server returned {code}: {message}"))
        }
        Err(e) => Err(format!("Failed to reach {url}: {e}")),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match send(&cli.url, &cli.command.into_request()) {
        Ok(response) => {
            let display = newest_first(response);
            match serde_json::to_string_pretty(&display) {
                Ok(text) => println!("{text}"),
                Err(_) => println!("{display}"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
