//! Text command protocol.
//!
//! A request line is split on whitespace: the first word names the command,
//! the rest are its arguments. Free-text descriptions are the remaining
//! words re-joined with single spaces. Every request yields exactly one
//! reply string; errors are replies too, never failures of the daemon.
//!
//! | request                     | reply                                   |
//! |-----------------------------|-----------------------------------------|
//! | `add <token> [text...]`     | duration and finish time                |
//! | `describe <id> [text...]`   | `updated`                               |
//! | `remove <id>`               | `removed`                               |
//! | `list`                      | JSON `[[id, text, epoch_secs], ...]`    |
//! | empty line (poll)           | expired-timer summary, or empty         |
//! | `exit` / `quit` / `bye`     | `bye.` and the daemon stops             |

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::alarm::AlarmController;
use crate::duration::{expiry_after, format_duration, format_instant};
use crate::identity::TimerId;
use crate::ipc::types::{SHUTDOWN_SENTINEL, TimerRecord};
use crate::store::TimerStore;

pub const NOT_FOUND: &str = "that timer doesn't exist.";
pub const BAD_TIME_FORMAT: &str = "bad time format";

/// Everything a command handler may touch, borrowed from the control loop
/// for the duration of one request.
pub struct Session<'a> {
    pub store: &'a mut TimerStore,
    pub alarm: &'a mut AlarmController,
    pub now: DateTime<Utc>,
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// The client asked the daemon to exit.
    Shutdown,
}

impl Reply {
    fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// The string sent back over the wire.
    pub fn into_wire(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Shutdown => SHUTDOWN_SENTINEL.to_string(),
        }
    }
}

type Handler = fn(&mut Session<'_>, &[&str]) -> Reply;

/// Command name → handler table, built once at startup.
pub struct Dispatcher {
    handlers: HashMap<&'static str, Handler>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let table: [(&'static str, Handler); 8] = [
            ("add", handle_add),
            ("describe", handle_describe),
            ("remove", handle_remove),
            ("list", handle_list),
            ("", handle_poll),
            ("exit", handle_exit),
            ("quit", handle_exit),
            ("bye", handle_exit),
        ];
        Self {
            handlers: table.into_iter().collect(),
        }
    }

    /// Parse and execute one request line.
    pub fn dispatch(&self, session: &mut Session<'_>, line: &str) -> Reply {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or("");
        let args: Vec<&str> = words.collect();

        match self.handlers.get(command) {
            Some(handler) => handler(session, args.as_slice()),
            None => Reply::Text(format!("{command}: unknown command")),
        }
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn handle_add(session: &mut Session<'_>, args: &[&str]) -> Reply {
    let Some((token, words)) = args.split_first() else {
        return Reply::text("expected at least one argument");
    };
    let description = words.join(" ");
    let Some((duration, expiry)) = expiry_after(token, session.now) else {
        return Reply::text(BAD_TIME_FORMAT);
    };

    let id = match session.store.add(description.clone(), expiry) {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "Identity allocation failed");
            return Reply::text("could not allocate a timer identity");
        }
    };
    info!(%id, %description, expiry = %format_instant(expiry), "Timer added");

    let mut reply = String::new();
    if !description.is_empty() {
        reply.push_str(&description);
        reply.push('\n');
    }
    reply.push_str(&format!(
        "duration: {}\nfinishes at: {}",
        format_duration(duration),
        format_instant(expiry)
    ));
    Reply::Text(reply)
}

fn handle_describe(session: &mut Session<'_>, args: &[&str]) -> Reply {
    let Some((identity, words)) = args.split_first() else {
        return Reply::text("expected at least 1 argument");
    };
    let Ok(id) = identity.parse::<TimerId>() else {
        return Reply::text(NOT_FOUND);
    };
    match session.store.describe(&id, words.join(" ")) {
        Ok(()) => {
            info!(%id, "Timer described");
            Reply::text("updated")
        }
        Err(_) => Reply::text(NOT_FOUND),
    }
}

fn handle_remove(session: &mut Session<'_>, args: &[&str]) -> Reply {
    let [identity] = args else {
        return Reply::text("expected 1 argument");
    };
    let Ok(id) = identity.parse::<TimerId>() else {
        return Reply::text(NOT_FOUND);
    };
    match session.store.remove(&id) {
        Ok(timer) => {
            info!(%id, description = %timer.description, "Timer removed");
            Reply::text("removed")
        }
        Err(_) => Reply::text(NOT_FOUND),
    }
}

fn handle_list(session: &mut Session<'_>, args: &[&str]) -> Reply {
    if !args.is_empty() {
        return Reply::text("expected no arguments");
    }
    let records: Vec<TimerRecord> = session
        .store
        .list()
        .into_iter()
        .map(TimerRecord::from)
        .collect();
    match serde_json::to_string(&records) {
        Ok(json) => Reply::Text(json),
        Err(e) => Reply::Text(format!("failed to encode timer list: {e}")),
    }
}

fn handle_poll(session: &mut Session<'_>, _args: &[&str]) -> Reply {
    Reply::Text(session.alarm.acknowledge().unwrap_or_default())
}

fn handle_exit(_session: &mut Session<'_>, _args: &[&str]) -> Reply {
    Reply::Shutdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmState;
    use crate::alarm::tests::CountingNotifier;
    use crate::monitor;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    struct Fixture {
        dispatcher: Dispatcher,
        store: TimerStore,
        alarm: AlarmController,
        now: DateTime<Utc>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dispatcher: Dispatcher::new(),
                store: TimerStore::new(),
                alarm: AlarmController::new(Box::new(CountingNotifier::default())),
                now: Utc::now(),
            }
        }

        fn send(&mut self, line: &str) -> Reply {
            let mut session = Session {
                store: &mut self.store,
                alarm: &mut self.alarm,
                now: self.now,
            };
            self.dispatcher.dispatch(&mut session, line)
        }

        fn text(&mut self, line: &str) -> String {
            self.send(line).into_wire()
        }

        fn advance(&mut self, secs: i64) {
            self.now += TimeDelta::seconds(secs);
            monitor::sweep(&mut self.store, &mut self.alarm, self.now);
        }

        fn only_id(&self) -> String {
            self.store.list()[0].id.to_string()
        }
    }

    #[test]
    fn test_command_table() {
        assert_eq!(
            Dispatcher::new().commands(),
            vec!["", "add", "bye", "describe", "exit", "list", "quit", "remove"]
        );
    }

    #[test]
    fn test_add_with_description() {
        let mut fx = Fixture::new();
        let reply = fx.text("add 10s note to self");

        let lines: Vec<&str> = reply.lines().collect();
        assert_eq!(lines[0], "note to self");
        assert_eq!(lines[1], "duration: 0:00:10");
        assert!(lines[2].starts_with("finishes at: "));

        let timers = fx.store.list();
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].description, "note to self");
        assert_eq!(timers[0].expiry, fx.now + TimeDelta::seconds(10));
    }

    #[test]
    fn test_add_without_description() {
        let mut fx = Fixture::new();
        let reply = fx.text("add 1h");
        assert!(reply.starts_with("duration: 1:00:00\n"));
        assert_eq!(fx.store.list()[0].description, "");
    }

    #[test]
    fn test_add_errors() {
        let mut fx = Fixture::new();
        assert_eq!(fx.text("add"), "expected at least one argument");
        assert_eq!(fx.text("add soon tea"), BAD_TIME_FORMAT);
        assert_eq!(fx.text("add 10s! tea"), BAD_TIME_FORMAT);
        assert_eq!(fx.text("add -5m tea"), BAD_TIME_FORMAT);
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_zero_duration_expires_on_next_tick() {
        let mut fx = Fixture::new();
        fx.text("add 0s now");
        assert_eq!(fx.store.len(), 1);

        fx.advance(0);
        assert!(fx.store.is_empty());
        assert_eq!(fx.alarm.state(), AlarmState::Active);
    }

    #[test]
    fn test_describe() {
        let mut fx = Fixture::new();
        fx.text("add 5m old");
        let id = fx.only_id();

        assert_eq!(fx.text(&format!("describe {id} brand new  text")), "updated");
        assert_eq!(fx.store.list()[0].description, "brand new text");
    }

    #[test]
    fn test_describe_errors() {
        let mut fx = Fixture::new();
        fx.text("add 5m keep");
        assert_eq!(fx.text("describe"), "expected at least 1 argument");
        assert_eq!(fx.text("describe nope x"), NOT_FOUND);
        assert_eq!(
            fx.text("describe 01ARZ3NDEKTSV4RRFFQ69G5FAV x"),
            NOT_FOUND
        );
        assert_eq!(fx.store.list()[0].description, "keep");
    }

    #[test]
    fn test_remove() {
        let mut fx = Fixture::new();
        fx.text("add 5m doomed");
        let id = fx.only_id();

        assert_eq!(fx.text(&format!("remove {id}")), "removed");
        assert!(fx.store.is_empty());
        assert_eq!(fx.text(&format!("remove {id}")), NOT_FOUND);
    }

    #[test]
    fn test_remove_arity() {
        let mut fx = Fixture::new();
        fx.text("add 5m stays");
        let id = fx.only_id();
        assert_eq!(fx.text("remove"), "expected 1 argument");
        assert_eq!(fx.text(&format!("remove {id} extra")), "expected 1 argument");
        assert_eq!(fx.store.len(), 1);
    }

    #[test]
    fn test_list() {
        let mut fx = Fixture::new();
        assert_eq!(fx.text("list"), "[]");

        fx.text("add 1h later");
        fx.text("add 1m sooner");
        let records: Vec<TimerRecord> = serde_json::from_str(&fx.text("list")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description(), "sooner");
        assert_eq!(records[1].description(), "later");
        assert_eq!(
            records[0].expiry().unwrap().timestamp(),
            (fx.now + TimeDelta::minutes(1)).timestamp()
        );

        assert_eq!(fx.text("list everything"), "expected no arguments");
    }

    #[test]
    fn test_poll_drains_summary_once() {
        let mut fx = Fixture::new();
        assert_eq!(fx.text(""), "");

        fx.text("add 10s note");
        fx.advance(5);
        assert_eq!(fx.text(""), "");
        fx.advance(5);

        let list: Vec<TimerRecord> = serde_json::from_str(&fx.text("list")).unwrap();
        assert!(list.is_empty());

        let summary = fx.text("");
        assert_eq!(summary.lines().filter(|l| l.ends_with(" : note")).count(), 1);
        assert_eq!(fx.alarm.state(), AlarmState::Idle);
        assert_eq!(fx.text(""), "");
    }

    #[test]
    fn test_other_commands_do_not_drain() {
        let mut fx = Fixture::new();
        fx.text("add 0s ping");
        fx.advance(1);
        fx.text("list");
        fx.text("add 1h other");
        assert_eq!(fx.alarm.state(), AlarmState::Active);
        assert_eq!(fx.alarm.pending().len(), 1);
    }

    #[test]
    fn test_whitespace_only_is_a_poll() {
        let mut fx = Fixture::new();
        assert_eq!(fx.send("   "), Reply::Text(String::new()));
    }

    #[test]
    fn test_shutdown_words() {
        let mut fx = Fixture::new();
        for word in ["exit", "quit", "bye"] {
            assert_eq!(fx.send(word), Reply::Shutdown);
        }
        assert_eq!(Reply::Shutdown.into_wire(), SHUTDOWN_SENTINEL);
    }

    #[test]
    fn test_unknown_command() {
        let mut fx = Fixture::new();
        assert_eq!(fx.text("launch rockets"), "launch: unknown command");
    }
}
