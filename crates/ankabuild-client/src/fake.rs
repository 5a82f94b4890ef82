use crate::client::AnkaClient;
use crate::output::CommandResult;
use crate::ClientError;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

enum Scripted {
    Result(CommandResult),
    LaunchFailure(String),
}

/// Scripted in-memory client.
///
/// Responses are keyed by the full command line, `"<command> <args...>"`
/// (for example `"stop --force foo"`). Unscripted commands succeed with an
/// empty OK envelope. Every invocation is recorded in order.
#[derive(Default)]
pub struct FakeClient {
    responses: Mutex<HashMap<String, Scripted>>,
    commands: Mutex<Vec<String>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, command_line: &str, result: CommandResult) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command_line.to_owned(), Scripted::Result(result));
        self
    }

    /// Make `command_line` fail as if the tool could not be started.
    pub fn fail(&self, command_line: &str, message: &str) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                command_line.to_owned(),
                Scripted::LaunchFailure(message.to_owned()),
            );
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_commands(&self) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn command_line(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        command.to_owned()
    } else {
        format!("{command} {}", args.join(" "))
    }
}

impl AnkaClient for FakeClient {
    fn invoke(&self, command: &str, args: &[String]) -> Result<CommandResult, ClientError> {
        let line = command_line(command, args);
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.clone());

        let responses = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match responses.get(&line) {
            Some(Scripted::Result(result)) => Ok(result.clone()),
            Some(Scripted::LaunchFailure(message)) => Err(ClientError::ProcessLaunch {
                binary: "anka".to_owned(),
                source: std::io::Error::other(message.clone()),
            }),
            None => Ok(CommandResult::ok(None)),
        }
    }
}
