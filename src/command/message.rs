use super::{settle, Arg, Args, Arity, Command, CommandError, CommandFactory, Output};
use crate::adapter::{Adapter, Operation};

pub const CATALOG: &[(&str, CommandFactory)] = &[
    (SendMessage::NAME, SendMessage::build),
    (SendPicture::NAME, SendPicture::build),
    (SendDocument::NAME, SendDocument::build),
];

/// `SendMessage||<contact>||<message>`
#[derive(Debug)]
pub struct SendMessage {
    contact_name: String,
    message: String,
}

impl SendMessage {
    pub const NAME: &'static str = "SendMessage";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        let args = Args::check(Self::NAME, Arity::exactly(2), args)?;
        Ok(Box::new(Self {
            contact_name: args.scalar(0)?,
            message: args.scalar(1)?,
        }))
    }
}

impl Command for SendMessage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        settle(
            adaptee.message().send_message(&self.contact_name, &self.message),
            &[Operation::SendMessage],
            Output::Flag,
        )
    }
}

/// `SendPicture||<contact>||<path>[||<caption>]`
#[derive(Debug)]
pub struct SendPicture {
    name: String,
    picture_location: String,
    caption: Option<String>,
}

impl SendPicture {
    pub const NAME: &'static str = "SendPicture";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        let args = Args::check(Self::NAME, Arity::between(2, 3), args)?;
        Ok(Box::new(Self {
            name: args.scalar(0)?,
            picture_location: args.scalar(1)?,
            caption: args.optional(2)?,
        }))
    }
}

impl Command for SendPicture {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        settle(
            adaptee.message().send_picture(
                &self.name,
                &self.picture_location,
                self.caption.as_deref(),
            ),
            &[Operation::SendPicture],
            Output::Flag,
        )
    }
}

/// `SendDocument||<contact>||<path>`
#[derive(Debug)]
pub struct SendDocument {
    name: String,
    document_location: String,
}

impl SendDocument {
    pub const NAME: &'static str = "SendDocument";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        let args = Args::check(Self::NAME, Arity::exactly(2), args)?;
        Ok(Box::new(Self {
            name: args.scalar(0)?,
            document_location: args.scalar(1)?,
        }))
    }
}

impl Command for SendDocument {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        settle(
            adaptee
                .message()
                .send_document(&self.name, &self.document_location),
            &[Operation::SendDocument],
            Output::Flag,
        )
    }
}
