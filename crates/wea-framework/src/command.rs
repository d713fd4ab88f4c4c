//! Prefix commands such as `/echo hello world`.
//!
//! A command is recognised when the message text (leading whitespace
//! ignored) starts with `prefix + name` followed by the end of the text or
//! whitespace. The remainder is split shell-style into arguments.
//!
//! While a command route runs, its metadata carries:
//!
//! | key                  | type          | set                         |
//! |----------------------|---------------|-----------------------------|
//! | [`COMMAND_KEY`]      | `String`      | before the handler          |
//! | [`COMMAND_ARGS_KEY`] | `Vec<String>` | before the handler          |
//! | [`EXECUTED_COMMAND_KEY`] | `String`  | after the handler succeeded |

use std::sync::Arc;

use tracing::{debug, warn};

use crate::event_bus::{EventBus, EventType, MessageEvent};
use crate::middleware::{self, Middleware};

/// Metadata key holding the command name.
pub const COMMAND_KEY: &str = "command";
/// Metadata key holding the parsed arguments.
pub const COMMAND_ARGS_KEY: &str = "command_args";
/// Metadata key holding the name of a command that completed successfully.
pub const EXECUTED_COMMAND_KEY: &str = "executed_command";

/// A command trigger: prefix plus name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    prefix: String,
    name: String,
}

impl CommandSpec {
    /// Creates a command triggered by `prefix` immediately followed by `name`.
    pub fn new(prefix: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
        }
    }

    /// Returns the prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full trigger, e.g. `/echo`.
    pub fn trigger(&self) -> String {
        format!("{}{}", self.prefix, self.name)
    }

    /// Parses `text` as an invocation of this command.
    ///
    /// Returns the arguments, or `None` if `text` does not invoke the
    /// command. `/echo` and `/echo  ` both yield an empty argument list;
    /// `/echoes` does not match `/echo`.
    pub fn parse(&self, text: &str) -> Option<Vec<String>> {
        let rest = text
            .trim_start()
            .strip_prefix(self.prefix.as_str())?
            .strip_prefix(self.name.as_str())?;

        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }

        Some(shell_split(rest))
    }
}

/// Simple shell-like argument splitting.
///
/// Handles:
/// - Whitespace-separated arguments
/// - Quoted strings (single and double quotes)
/// - Backslash escapes inside double quotes
pub fn shell_split(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => escape_next = true,
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                in_word = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                in_word = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if in_word {
        args.push(current);
    }

    args
}

/// Route-local middleware installed by
/// [`LogicManager::handle_command`](crate::LogicManager::handle_command).
///
/// Publishing failures are logged and never fail the route.
pub(crate) fn command_layer(spec: CommandSpec, route: String, bus: Arc<EventBus>) -> Middleware {
    middleware::from_fn(move |ctx, next| {
        let spec = spec.clone();
        let route = route.clone();
        let bus = Arc::clone(&bus);
        async move {
            let args = spec.parse(&ctx.message_text()).unwrap_or_default();
            debug!(command = %spec.trigger(), args = args.len(), "Running command");
            ctx.set(COMMAND_KEY, spec.name().to_string());
            ctx.set(COMMAND_ARGS_KEY, args);

            next.run(Arc::clone(&ctx)).await?;

            ctx.set(EXECUTED_COMMAND_KEY, spec.name().to_string());
            let event = MessageEvent::new(EventType::COMMAND_EXECUTED, Arc::clone(&ctx))
                .with_route(route);
            if let Err(error) = bus
                .publish(&EventType::COMMAND_EXECUTED, Arc::new(event), ctx.scope())
                .await
            {
                warn!(command = %spec.trigger(), %error, "Command listener failed");
            }
            Ok(())
        }
    })
}
