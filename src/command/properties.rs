use super::{settle, Arg, Args, Arity, Command, CommandError, CommandFactory, Output};
use crate::adapter::{Adapter, Operation};

pub const CATALOG: &[(&str, CommandFactory)] = &[
    (GetQrCode::NAME, GetQrCode::build),
    (CheckPoint::NAME, CheckPoint::build),
    (IsConnected::NAME, IsConnected::build),
];

/// `GetQrCode`: JSON `{"file_name": .., "image": <base64 png>}`.
#[derive(Debug)]
pub struct GetQrCode;

impl GetQrCode {
    pub const NAME: &'static str = "GetQrCode";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        Args::check(Self::NAME, Arity::exactly(0), args)?;
        Ok(Box::new(Self))
    }
}

impl Command for GetQrCode {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        let qr = match adaptee.properties().get_qrcode() {
            Ok(qr) => qr,
            Err(e) => return settle(Err(e), &[Operation::GetQrCode], Output::Json),
        };
        let value =
            serde_json::to_value(qr).map_err(|e| CommandError::Unexpected(e.to_string()))?;
        Ok(Some(Output::Json(value)))
    }
}

/// `CheckPoint`: whether sign-in has completed.
#[derive(Debug)]
pub struct CheckPoint;

impl CheckPoint {
    pub const NAME: &'static str = "CheckPoint";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        Args::check(Self::NAME, Arity::exactly(0), args)?;
        Ok(Box::new(Self))
    }
}

impl Command for CheckPoint {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        settle(
            adaptee.properties().check_point(),
            &[Operation::CheckPoint],
            Output::Flag,
        )
    }
}

/// `IsConnected`. A lost connection is an expected answer, not a fault.
#[derive(Debug)]
pub struct IsConnected;

impl IsConnected {
    pub const NAME: &'static str = "IsConnected";

    pub fn build(args: Vec<Arg>) -> Result<Box<dyn Command>, CommandError> {
        Args::check(Self::NAME, Arity::exactly(0), args)?;
        Ok(Box::new(Self))
    }
}

impl Command for IsConnected {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invoke(&self, adaptee: &dyn Adapter) -> Result<Option<Output>, CommandError> {
        settle(
            adaptee.properties().is_connected(),
            &[Operation::IsConnected, Operation::ConnectionLost],
            Output::Flag,
        )
    }
}
