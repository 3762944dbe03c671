use std::time::Duration;

use super::{settle, Arg, Args, Arity, Command, CommandError, CommandFactory, Output};
use crate::adapter::{Adapter, Operation};

pub const CATALOG: &[(&str, CommandFactory)] = &[
    (GetStatus::NAME, GetStatus::build),
    (GetLastSeen::NAME, GetLastSeen::build),
];

/// How long the adapter waits for a contact's presence line by default.
const LAST_SEEN_TIMEOUT: Duration = Duration::from_secs(10);

/// `GetStatus||<contact>`
#[derive(Debug)]
pub struct GetStatus {
    name: String,
}

impl GetStatus {
    pub const NAME: &'static str = "GetStatus";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        let args = Args::check(Self::NAME, Arity::exactly(1), args)?;
        Ok(Box::new(Self {
            name: args.scalar(0)?,
        }))
    }
}

impl Command for GetStatus {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        settle(
            adaptee.person().get_status(&self.name),
            &[Operation::GetStatus],
            Output::Text,
        )
    }
}

/// `GetLastSeen||<contact>[||<timeout secs>]`
#[derive(Debug)]
pub struct GetLastSeen {
    name: String,
    timeout: Duration,
}

impl GetLastSeen {
    pub const NAME: &'static str = "GetLastSeen";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        let args = Args::check(Self::NAME, Arity::between(1, 2), args)?;
        Ok(Box::new(Self {
            name: args.scalar(0)?,
            timeout: args.seconds(1)?.unwrap_or(LAST_SEEN_TIMEOUT),
        }))
    }
}

impl Command for GetLastSeen {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        settle(
            adaptee.person().get_last_seen(&self.name, self.timeout),
            &[Operation::GetLastSeen],
            Output::Text,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockAdapterFactory;
    use crate::adapter::{AdapterFactory, AdapterOptions};

    fn scalars(values: &[&str]) -> Vec<Arg> {
        values.iter().map(|v| Arg::Scalar(v.to_string())).collect()
    }

    #[test]
    fn last_seen_uses_default_timeout() {
        let factory = MockAdapterFactory::new();
        let adapter = factory
            .create("t", &AdapterOptions::default())
            .unwrap()
            .unwrap();
        let output = GetLastSeen::build(scalars(&["Bob"]))
            .unwrap()
            .invoke(adapter.as_ref())
            .unwrap();
        assert_eq!(
            output,
            Some(Output::Text("[get_last_seen] name: Bob, timeout: 10".into()))
        );
    }

    #[test]
    fn last_seen_timeout_must_be_numeric() {
        assert!(matches!(
            GetLastSeen::build(scalars(&["Bob", "soon"])),
            Err(CommandError::NotANumber { position: 2, .. })
        ));
        assert!(GetLastSeen::build(scalars(&["Bob", " 30 "])).is_ok());
    }

    #[test]
    fn status_reaches_person_capability() {
        let factory = MockAdapterFactory::new();
        let adapter = factory
            .create("t", &AdapterOptions::default())
            .unwrap()
            .unwrap();
        GetStatus::build(scalars(&["Ann"]))
            .unwrap()
            .invoke(adapter.as_ref())
            .unwrap();
        assert!(factory.journal().contains("t", "[get_status] name: Ann"));
    }
}
