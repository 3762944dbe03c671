//! Command objects and the name → factory registry.
//!
//! Each command validates its positional arguments when built and, when
//! invoked, calls exactly one adapter method. Failures the command expects
//! from that method come back as result text; anything else is returned as
//! [`CommandError::Unexpected`] for the session layer to report.

pub mod group;
pub mod manager;
pub mod message;
pub mod parser;
pub mod person;
pub mod properties;

use std::collections::HashMap;
use std::fmt;

use crate::adapter::{Adapter, AdapterError, AdapterResult, Operation};

pub use parser::{parse, Arg, ParseError, ParsedCommand};

/// Result value of one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Text(String),
    Flag(bool),
    Count(u64),
    List(Vec<String>),
    Json(serde_json::Value),
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Text(text) => f.write_str(text),
            Output::Flag(flag) => write!(f, "{}", flag),
            Output::Count(count) => write!(f, "{}", count),
            Output::List(items) => {
                let json = serde_json::to_string(items).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            Output::Json(value) => write!(f, "{}", value),
        }
    }
}

/// Accepted number of positional arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: n }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    fn accepts(self, n: usize) -> bool {
        (self.min..=self.max).contains(&n)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid arguments for {command}: expected {expected} argument(s), got {got}.")]
    InvalidArguments {
        command: &'static str,
        expected: Arity,
        got: usize,
    },
    #[error("Invalid arguments for {command}: argument {position} must not be a list.")]
    UnexpectedList {
        command: &'static str,
        position: usize,
    },
    #[error("Invalid arguments for {command}: argument {position} is not a number: {value}.")]
    NotANumber {
        command: &'static str,
        position: usize,
        value: String,
    },
    #[error("{0}")]
    Unexpected(String),
}

/// Positional arguments checked against a command's arity.
#[derive(Debug, Clone)]
pub struct Args {
    command: &'static str,
    arity: Arity,
    values: Vec<Arg>,
}

impl Args {
    pub fn check(command: &'static str, arity: Arity, values: Vec<Arg>) -> Result<Self, CommandError> {
        if !arity.accepts(values.len()) {
            return Err(CommandError::InvalidArguments {
                command,
                expected: arity,
                got: values.len(),
            });
        }
        Ok(Self {
            command,
            arity,
            values,
        })
    }

    /// Required scalar at `index`.
    pub fn scalar(&self, index: usize) -> Result<String, CommandError> {
        self.optional(index)?
            .ok_or(CommandError::InvalidArguments {
                command: self.command,
                expected: self.arity,
                got: self.values.len(),
            })
    }

    /// Scalar at `index`, if supplied.
    pub fn optional(&self, index: usize) -> Result<Option<String>, CommandError> {
        match self.values.get(index) {
            None => Ok(None),
            Some(Arg::Scalar(value)) => Ok(Some(value.clone())),
            Some(Arg::List(_)) => Err(CommandError::UnexpectedList {
                command: self.command,
                position: index + 1,
            }),
        }
    }

    /// Optional whole number of seconds at `index`.
    pub fn seconds(&self, index: usize) -> Result<Option<std::time::Duration>, CommandError> {
        match self.optional(index)? {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(|secs| Some(std::time::Duration::from_secs(secs)))
                .map_err(|_| CommandError::NotANumber {
                    command: self.command,
                    position: index + 1,
                    value,
                }),
        }
    }

    /// List at `index`; a bare scalar counts as a one-element list.
    pub fn list(&self, index: usize) -> Result<Vec<String>, CommandError> {
        match self.values.get(index) {
            Some(Arg::List(items)) => Ok(items.clone()),
            Some(Arg::Scalar(value)) => Ok(vec![value.clone()]),
            None => Err(CommandError::InvalidArguments {
                command: self.command,
                expected: self.arity,
                got: self.values.len(),
            }),
        }
    }
}

pub trait Command {
    fn name(&self) -> &'static str;

    /// Run against the session's adapter. `Ok(None)` means no result.
    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError>;

    /// Commands that never touch an adapter, so no session is needed.
    fn is_noop(&self) -> bool {
        false
    }
}

pub type CommandFactory = fn(Vec<Arg>) -> Result<Box<dyn Command>, CommandError>;

/// Turn an adapter result into a command result.
///
/// Domain failures raised by one of `handled` become the result text.
pub(crate) fn settle<T>(
    result: AdapterResult<T>,
    handled: &[Operation],
    into: impl FnOnce(T) -> Output,
) -> Result<Option<Output>, CommandError> {
    match result {
        Ok(value) => Ok(Some(into(value))),
        Err(AdapterError::Failed { operation, message }) if handled.contains(&operation) => {
            Ok(Some(Output::Text(message)))
        }
        Err(e) => Err(CommandError::Unexpected(e.to_string())),
    }
}

/// Stand-in for names nobody registered. Does nothing and has no result.
#[derive(Debug)]
pub struct NoCommand;

impl NoCommand {
    pub const NAME: &'static str = "NoCommand";

    fn build(_args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        Ok(Box::new(NoCommand))
    }
}

impl Command for NoCommand {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, _adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        tracing::debug!("Unknown command executed.");
        Ok(None)
    }

    fn is_noop(&self) -> bool {
        true
    }
}

/// Immutable catalog of every command family.
pub struct CommandRegistry {
    factories: HashMap<&'static str, CommandFactory>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let families = [
            message::CATALOG,
            group::CATALOG,
            person::CATALOG,
            manager::CATALOG,
            properties::CATALOG,
        ];
        let factories = families
            .into_iter()
            .flat_map(|family| family.iter().copied())
            .collect();
        Self { factories }
    }

    /// Factory for `name`; unknown names get [`NoCommand`].
    pub fn resolve(&self, name: &str) -> CommandFactory {
        self.factories
            .get(name)
            .copied()
            .unwrap_or(NoCommand::build as CommandFactory)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Build the command for `name` from its arguments.
    pub fn build(&self, name: &str, args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        (self.resolve(name))(args)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::{InjectedFailure, MockAdapterFactory};
    use crate::adapter::{AdapterFactory, AdapterOptions};

    fn scalar(s: &str) -> Arg {
        Arg::Scalar(s.to_string())
    }

    #[test]
    fn catalog_has_every_client_command() {
        let registry = CommandRegistry::new();
        for name in [
            "SendMessage",
            "SendPicture",
            "SendDocument",
            "GroupCreate",
            "GroupGetInviteLink",
            "GroupRename",
            "GroupSetPicture",
            "GroupOnlyAdminsSendMessages",
            "GroupAllUsersSendMessages",
            "GroupOnlyAdminsChangeGroupData",
            "GroupAllUsersChangeGroupData",
            "GroupParticipantCount",
            "GroupParticipants",
            "GroupJoin",
            "GroupExit",
            "GetQrCode",
            "CheckPoint",
            "IsConnected",
            "Quit",
            "GetStatus",
            "GetLastSeen",
        ] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert_eq!(registry.names().len(), 21);
    }

    #[test]
    fn unknown_name_resolves_to_no_command() {
        let registry = CommandRegistry::new();
        let command = registry.build("Bogus", vec![scalar("x")]).unwrap();
        assert_eq!(command.name(), NoCommand::NAME);
        assert!(command.is_noop());

        let factory = MockAdapterFactory::new();
        let adapter = factory
            .create("t", &AdapterOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(command.invoke(adapter.as_ref()), Ok(None));
        assert!(factory.journal().entries().is_empty());
    }

    #[test]
    fn registered_names_match_command_names() {
        let registry = CommandRegistry::new();
        let args = vec![scalar("a"), scalar("b"), scalar("c")];
        for name in registry.names() {
            let command = [3, 2, 1, 0]
                .into_iter()
                .find_map(|n| registry.build(name, args[..n].to_vec()).ok())
                .unwrap();
            assert_eq!(command.name(), name);
        }
    }

    #[test]
    fn arity_message() {
        let err = Args::check("SendMessage", Arity::exactly(2), vec![scalar("a")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid arguments for SendMessage: expected 2 argument(s), got 1."
        );

        let err = Args::check("GetLastSeen", Arity::between(1, 2), vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid arguments for GetLastSeen: expected 1 to 2 argument(s), got 0."
        );
    }

    #[test]
    fn list_where_scalar_expected_is_rejected() {
        let args = Args::check(
            "SendMessage",
            Arity::exactly(2),
            vec![Arg::List(vec!["a".into()]), scalar("b")],
        )
        .unwrap();
        assert_eq!(
            args.scalar(0),
            Err(CommandError::UnexpectedList {
                command: "SendMessage",
                position: 1
            })
        );
    }

    #[test]
    fn scalar_where_list_expected_is_wrapped() {
        let args = Args::check("GroupCreate", Arity::between(2, 3), vec![scalar("T"), scalar("Ann")])
            .unwrap();
        assert_eq!(args.list(1).unwrap(), vec!["Ann".to_string()]);
        assert_eq!(args.optional(2).unwrap(), None);
    }

    #[test]
    fn settle_scopes_domain_failures() {
        let handled = settle::<bool>(
            Err(AdapterError::failed(Operation::RenameGroup)),
            &[Operation::RenameGroup],
            Output::Flag,
        );
        assert_eq!(
            handled,
            Ok(Some(Output::Text(
                "Execution failed on: \"Change Group Name\".".to_string()
            )))
        );

        let foreign = settle::<bool>(
            Err(AdapterError::failed(Operation::SendMessage)),
            &[Operation::RenameGroup],
            Output::Flag,
        );
        assert!(matches!(foreign, Err(CommandError::Unexpected(_))));
    }

    #[test]
    fn unexpected_adapter_error_escapes_command() {
        let factory = MockAdapterFactory::new()
            .with_failure(Operation::SendMessage, InjectedFailure::Unexpected);
        let adapter = factory
            .create("t", &AdapterOptions::default())
            .unwrap()
            .unwrap();
        let command = CommandRegistry::new()
            .build("SendMessage", vec![scalar("Alice"), scalar("Hi")])
            .unwrap();
        let err = command.invoke(adapter.as_ref()).unwrap_err();
        assert_eq!(
            err,
            CommandError::Unexpected("mock driver fault during Send Message".to_string())
        );
    }

    #[test]
    fn output_rendering() {
        assert_eq!(Output::Flag(true).to_string(), "true");
        assert_eq!(Output::Count(3).to_string(), "3");
        assert_eq!(Output::Text("hi".into()).to_string(), "hi");
        assert_eq!(
            Output::List(vec!["a".into(), "b".into()]).to_string(),
            r#"["a","b"]"#
        );
        assert_eq!(
            Output::Json(serde_json::json!({"file_name": "x.png"})).to_string(),
            r#"{"file_name":"x.png"}"#
        );
    }
}
