use super::{settle, Arg, Args, Arity, Command, CommandError, CommandFactory, Output};
use crate::adapter::{Adapter, Operation};

pub const CATALOG: &[(&str, CommandFactory)] = &[(Quit::NAME, Quit::build)];

/// `Quit`: closes the client for this token. The session layer drops the
/// session once this command has run.
#[derive(Debug)]
pub struct Quit;

impl Quit {
    pub const NAME: &'static str = "Quit";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        Args::check(Self::NAME, Arity::exactly(0), args)?;
        Ok(Box::new(Self))
    }
}

impl Command for Quit {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        tracing::debug!(command = Self::NAME, "closing adapter");
        settle(adaptee.manager().quit(), &[Operation::Quit], Output::Flag)
    }
}
