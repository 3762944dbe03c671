//! TCP client for talking to a zap-server.
//!
//! Connects, answers the server's challenge with the shared key, then sends
//! command lines and reads one reply each.

use std::io;

use tokio::net::{TcpStream, ToSocketAddrs};

use crate::auth;
use crate::protocol::*;

/// A client connection to a zap-server.
pub struct Client {
    stream: TcpStream,
    welcome: WelcomeMsg,
}

impl Client {
    /// Connect and authenticate with `key`.
    pub async fn connect(addr: impl ToSocketAddrs, key: &str) -> io::Result<Self> {
        let mut stream = TcpStream::connect(addr).await?;
        let _ = stream.set_nodelay(true);

        let frame = Frame::read_from(&mut stream).await?;
        if frame.frame_type != FrameType::Challenge {
            return Err(unexpected(&frame));
        }
        let challenge: ChallengeMsg = parse(&frame)?;
        let digest = auth::answer_challenge(key, &challenge.nonce)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Frame::control(FrameType::ChallengeResponse, &ChallengeResponseMsg { digest })
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            .write_to(&mut stream)
            .await?;

        let frame = Frame::read_from(&mut stream).await?;

        match frame.frame_type {
            FrameType::Welcome => {
                let welcome = parse(&frame)?;
                Ok(Self { stream, welcome })
            }
            _ => Err(unexpected(&frame)),
        }
    }

    /// Server identity from the `Welcome` frame.
    pub fn server(&self) -> &WelcomeMsg {
        &self.welcome
    }

    /// Send one command line and wait for its reply.
    pub async fn send_command(&mut self, line: &str) -> io::Result<String> {
        Frame::text(FrameType::Command, line)
            .write_to(&mut self.stream)
            .await?;

        let frame = Frame::read_from(&mut self.stream).await?;
        match frame.frame_type {
            FrameType::Reply => Ok(frame.text_payload()),
            _ => Err(unexpected(&frame)),
        }
    }
}

fn parse<T: for<'de> serde::Deserialize<'de>>(frame: &Frame) -> io::Result<T> {
    frame
        .parse_json()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Turn a frame the client did not expect into an error, surfacing the
/// server's message for `Error` frames.
fn unexpected(frame: &Frame) -> io::Error {
    if frame.frame_type == FrameType::Error {
        match parse::<ErrorMsg>(frame) {
            Ok(err) if err.code == "auth_failed" => io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{}: {}", err.code, err.message),
            ),
            Ok(err) => io::Error::other(format!("{}: {}", err.code, err.message)),
            Err(e) => e,
        }
    } else {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unexpected response frame type: {:?}", frame.frame_type),
        )
    }
}
