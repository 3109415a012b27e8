//! The interactive front-end.
//!
//! A few commands are handled here rather than by the daemon: `list` is
//! rendered as a numbered table, and `describe`/`remove` accept those
//! numbers instead of raw identities. Everything else goes to the daemon
//! as typed.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use termtimer_core::IpcClient;
use termtimer_core::duration::{format_duration, format_instant};
use termtimer_core::ipc::{SHUTDOWN_SENTINEL, TimerRecord};
use tokio::io::{AsyncBufReadExt, BufReader};

pub const PROMPT: &str = "> ";

pub const HELP: &str = "\
list
add 3d6h5m2s description of timer goes here
del <TIMERNUMBER>
describe <TIMERNUMBER> new description goes here
quit";

const NOTHING_LISTED: &str = "I don't know of any timers yet, use the list command first.";
const UNKNOWN_NUMBER: &str = "I'm not aware of that timer.";

/// Whether the front-end keeps going after a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// What to do with one input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// Print locally, send nothing.
    Print(String),
    /// Forward this request and print the reply.
    Send(String),
    /// Fetch `list` and render it.
    List,
}

/// Front-end state: the numbering from the last `list`.
#[derive(Debug, Default)]
pub struct Shell {
    numbered: Option<HashMap<String, String>>,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide how to handle `line`.
    pub fn plan(&self, line: &str) -> Action {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Action::Send(line.to_string());
        };
        let args: Vec<&str> = words.collect();

        match command {
            "help" | "?" => match arity(command, &args, 0) {
                Ok(()) => Action::Print(HELP.to_string()),
                Err(msg) => Action::Print(msg),
            },
            "list" | "ls" | "show" => match arity(command, &args, 0) {
                Ok(()) => Action::List,
                Err(msg) => Action::Print(msg),
            },
            "describe" | "desc" => {
                let Some((number, words)) = args.split_first() else {
                    return Action::Print(arity_error(command, 1));
                };
                match self.identity(number) {
                    Ok(id) if words.is_empty() => Action::Send(format!("describe {id}")),
                    Ok(id) => Action::Send(format!("describe {id} {}", words.join(" "))),
                    Err(msg) => Action::Print(msg),
                }
            }
            "remove" | "del" | "rm" => {
                if let Err(msg) = arity(command, &args, 1) {
                    return Action::Print(msg);
                }
                match self.identity(args[0]) {
                    Ok(id) => Action::Send(format!("remove {id}")),
                    Err(msg) => Action::Print(msg),
                }
            }
            _ => Action::Send(line.to_string()),
        }
    }

    fn identity(&self, number: &str) -> Result<&str, String> {
        let numbered = self
            .numbered
            .as_ref()
            .ok_or_else(|| NOTHING_LISTED.to_string())?;
        numbered
            .get(number)
            .map(String::as_str)
            .ok_or_else(|| UNKNOWN_NUMBER.to_string())
    }

    /// Render timers latest-first so the soonest sits just above the
    /// prompt, and remember the numbering.
    pub fn render_list(&mut self, mut records: Vec<TimerRecord>, now: DateTime<Utc>) -> String {
        records.sort_by(|a, b| b.2.total_cmp(&a.2));

        let mut numbered = HashMap::with_capacity(records.len());
        let mut rows = Vec::with_capacity(records.len());
        for (n, record) in records.iter().enumerate() {
            let n = n + 1;
            numbered.insert(n.to_string(), record.identity().to_string());

            let expiry = record.expiry().unwrap_or(now);
            let remaining = (expiry - now).to_std().unwrap_or_default();
            rows.push(format!(
                "{n}) {}\n{}   ({})",
                record.description(),
                format_instant(expiry),
                format_duration(remaining)
            ));
        }
        self.numbered = Some(numbered);
        rows.join("\n")
    }
}

fn arity(command: &str, args: &[&str], expected: usize) -> Result<(), String> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(arity_error(command, expected))
    }
}

fn arity_error(command: &str, expected: usize) -> String {
    format!("{command} expects {expected} arguments.")
}

/// Print a daemon reply. `bye.` means the daemon is gone.
pub fn take_reply(reply: &str) -> Flow {
    if reply == SHUTDOWN_SENTINEL {
        println!("daemon is exiting (alarms will not go off)");
        return Flow::Exit;
    }
    if !reply.is_empty() {
        println!("{reply}");
    }
    Flow::Continue
}

/// Handle one input line end to end.
pub async fn run_line(shell: &mut Shell, client: &IpcClient, line: &str) -> Result<Flow> {
    match shell.plan(line) {
        Action::Print(text) => {
            println!("{text}");
            Ok(Flow::Continue)
        }
        Action::Send(request) => {
            let reply = client
                .send(&request)
                .await
                .context("daemon stopped responding")?;
            Ok(take_reply(&reply))
        }
        Action::List => {
            let records = client.list().await.context("daemon stopped responding")?;
            let table = shell.render_list(records, Utc::now());
            if !table.is_empty() {
                println!("{table}");
            }
            Ok(Flow::Continue)
        }
    }
}

/// Prompt loop over stdin until EOF or the daemon says goodbye.
pub async fn interactive(shell: &mut Shell, client: &IpcClient) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("^C");
                continue;
            }
        };
        let Some(line) = line else {
            println!();
            return Ok(());
        };
        if run_line(shell, client, &line).await? == Flow::Exit {
            return Ok(());
        }
    }
}
