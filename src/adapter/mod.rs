//! The collaborator boundary commands drive.
//!
//! An adapter performs actions on behalf of one token against the chat
//! client. It exposes five capability groups; commands reach exactly one
//! method through one of them. How an adapter fulfils a call (a real browser
//! driver, canned mock answers) is invisible to the command layer.

pub mod browser;
pub mod mock;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Operations an adapter can fail on, used to scope domain failures to the
/// command family that expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    // message
    SendMessage,
    SendBlindMessage,
    SendAnonMessage,
    SendPicture,
    SendDocument,
    LastMessage,
    MessagePresent,
    StarredMessages,
    // group
    GroupParticipantCount,
    GroupParticipants,
    CreateGroup,
    JoinGroup,
    GetInviteLink,
    ExitGroup,
    RenameGroup,
    SetGroupPicture,
    OnlyAdminsSendMessages,
    AllUsersSendMessages,
    OnlyAdminsChangeGroupData,
    AllUsersChangeGroupData,
    // person
    GetStatus,
    GetLastSeen,
    // manager
    GotoHome,
    ClearChat,
    OverrideTimeout,
    ProfilePicture,
    UnreadUserNames,
    Driver,
    Quit,
    // properties
    GetQrCode,
    CheckPoint,
    IsConnected,
    ConnectionLost,
}

impl Operation {
    /// Human-readable label used in default failure messages.
    pub fn label(self) -> &'static str {
        match self {
            Operation::SendMessage => "Send Message",
            Operation::SendBlindMessage => "Send Blind Message",
            Operation::SendAnonMessage => "Send Anonymous Message",
            Operation::SendPicture => "Send Picture",
            Operation::SendDocument => "Send Document",
            Operation::LastMessage => "Get Last Message",
            Operation::MessagePresent => "Check Message Present",
            Operation::StarredMessages => "Get Starred Messages",
            Operation::GroupParticipantCount => "Number of Group Participants",
            Operation::GroupParticipants => "Retrieve Group Participants",
            Operation::CreateGroup => "Create Group",
            Operation::JoinGroup => "Join Group",
            Operation::GetInviteLink => "Get Invite Group Link",
            Operation::ExitGroup => "Leave The Group",
            Operation::RenameGroup => "Change Group Name",
            Operation::SetGroupPicture => "Change Group Picture",
            Operation::OnlyAdminsSendMessages => "Admins Only Send Messages",
            Operation::AllUsersSendMessages => "All Users Send Messages",
            Operation::OnlyAdminsChangeGroupData => "Admins Only Can Change Group Data",
            Operation::AllUsersChangeGroupData => "All Users Can Change Group Data",
            Operation::GetStatus => "Get Status",
            Operation::GetLastSeen => "Get Last Seen",
            Operation::GotoHome => "Go to Home",
            Operation::ClearChat => "Clear Chat",
            Operation::OverrideTimeout => "Override Timeout",
            Operation::ProfilePicture => "Get Profile Picture",
            Operation::UnreadUserNames => "Unread User Names",
            Operation::Driver => "Get Driver",
            Operation::Quit => "Quit",
            Operation::GetQrCode => "Recover QR Code",
            Operation::CheckPoint => "Check Authentication on the Site",
            Operation::IsConnected => "Check Connection with Server",
            Operation::ConnectionLost => "Lost Connection With Server",
        }
    }
}

/// Failure raised by an adapter call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// The operation itself failed in an expected way (element missing,
    /// group not found, ...). Commands turn these into result text.
    #[error("{message}")]
    Failed {
        operation: Operation,
        message: String,
    },
    /// Anything the adapter did not anticipate.
    #[error("{0}")]
    Other(String),
}

impl AdapterError {
    /// Failure with the default `Execution failed on: "<label>".` message.
    pub fn failed(operation: Operation) -> Self {
        Self::Failed {
            operation,
            message: format!("Execution failed on: \"{}\".", operation.label()),
        }
    }

    pub fn failed_with(operation: Operation, message: impl Into<String>) -> Self {
        Self::Failed {
            operation,
            message: message.into(),
        }
    }

    /// The operation a domain failure belongs to, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Failed { operation, .. } => Some(*operation),
            Self::Other(_) => None,
        }
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Sign-in QR code captured from the client, returned as JSON on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCode {
    pub file_name: String,
    /// Base64-encoded PNG.
    pub image: String,
}

pub trait MessageCapability {
    fn send_message(&self, name: &str, message: &str) -> AdapterResult<bool>;
    /// Message for the currently open chat.
    fn send_blind_message(&self, message: &str) -> AdapterResult<bool>;
    /// Message to a phone number that is not a saved contact.
    fn send_anon_message(&self, phone: &str, text: &str) -> AdapterResult<bool>;
    fn send_picture(
        &self,
        name: &str,
        picture_location: &str,
        caption: Option<&str>,
    ) -> AdapterResult<bool>;
    fn send_document(&self, name: &str, document_location: &str) -> AdapterResult<bool>;
    fn get_last_message_for(&self, name: &str) -> AdapterResult<Vec<String>>;
    fn is_message_present(&self, username: &str, message: &str) -> AdapterResult<bool>;
    fn get_starred_messages(&self, delay: Duration) -> AdapterResult<Vec<String>>;
}

pub trait GroupCapability {
    fn participants_count(&self, group_name: &str) -> AdapterResult<u64>;
    fn get_participants(&self, group_name: &str) -> AdapterResult<Vec<String>>;
    fn create_group(
        &self,
        group_name: &str,
        members: &[String],
        picture_location: Option<&str>,
    ) -> AdapterResult<bool>;
    fn join_group(&self, invite_link: &str) -> AdapterResult<bool>;
    fn get_invite_link(&self, group_name: &str) -> AdapterResult<String>;
    fn exit_group(&self, group_name: &str) -> AdapterResult<bool>;
    fn rename(&self, old_name: &str, new_name: &str) -> AdapterResult<bool>;
    fn set_picture(&self, group_name: &str, picture_location: &str) -> AdapterResult<bool>;
    fn only_admins_send_messages(&self, group_name: &str) -> AdapterResult<bool>;
    fn all_users_send_messages(&self, group_name: &str) -> AdapterResult<bool>;
    fn only_admins_change_group_data(&self, group_name: &str) -> AdapterResult<bool>;
    fn all_users_change_group_data(&self, group_name: &str) -> AdapterResult<bool>;
}

pub trait PersonCapability {
    fn get_status(&self, name: &str) -> AdapterResult<String>;
    fn get_last_seen(&self, name: &str, timeout: Duration) -> AdapterResult<String>;
}

pub trait ManagerCapability {
    fn goto_home(&self) -> AdapterResult<bool>;
    fn clear_chat(&self, name: &str) -> AdapterResult<bool>;
    fn override_timeout(&self, new_timeout: Duration) -> AdapterResult<bool>;
    fn get_profile_pic(&self, name: &str) -> AdapterResult<bool>;
    fn unread_user_names(&self, scrolls: u32) -> AdapterResult<Vec<String>>;
    /// Description of the underlying driver, if the adapter has one.
    fn get_driver(&self) -> AdapterResult<Option<String>>;
    /// Close the client and release the driver.
    fn quit(&self) -> AdapterResult<bool>;
}

pub trait PropertiesCapability {
    fn get_qrcode(&self) -> AdapterResult<QrCode>;
    /// Whether the client's main screen is available (sign-in finished).
    fn check_point(&self) -> AdapterResult<bool>;
    fn is_connected(&self) -> AdapterResult<bool>;
}

/// A driver bound to one token.
///
/// Adapters are not required to be `Sync`: a session serializes access to
/// its adapter behind a mutex.
pub trait Adapter: Send {
    fn message(&self) -> &dyn MessageCapability;
    fn group(&self) -> &dyn GroupCapability;
    fn person(&self) -> &dyn PersonCapability;
    fn manager(&self) -> &dyn ManagerCapability;
    fn properties(&self) -> &dyn PropertiesCapability;
}

/// Server-wide adapter settings, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Run the driver without a visible window.
    pub headless: bool,
    /// Driver-level timeout; adapters may extend it via `override_timeout`.
    pub timeout: Duration,
}

impl AdapterOptions {
    /// Five days, matching the driver's own default session lifetime.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(432_000);
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            headless: true,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Builds one adapter per first-seen token.
pub trait AdapterFactory: Send + Sync {
    /// Construct the adapter for `token`.
    ///
    /// `Ok(None)` means the family cannot provide an adaptee; the session is
    /// still created and its commands become silent no-ops.
    fn create(
        &self,
        token: &str,
        options: &AdapterOptions,
    ) -> AdapterResult<Option<Box<dyn Adapter>>>;

    fn kind(&self) -> AdapterKind;
}

/// Adapter families selectable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdapterKind {
    Mock,
    #[default]
    Browser,
}

impl AdapterKind {
    pub fn factory(self) -> Arc<dyn AdapterFactory> {
        match self {
            AdapterKind::Mock => Arc::new(mock::MockAdapterFactory::new()),
            AdapterKind::Browser => Arc::new(browser::BrowserAdapterFactory::new()),
        }
    }
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterKind::Mock => write!(f, "mock"),
            AdapterKind::Browser => write!(f, "browser"),
        }
    }
}
