//! Console mock adapter.
//!
//! Answers every call with a canned value and echoes it as
//! `MOCK MESSAGE => Token<..>: ..`. Calls are also appended to a shared
//! [`MockJournal`] so callers can observe what a session asked for.
//! Failures can be injected per [`Operation`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::Mutex;
use rand::RngCore;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use super::{
    Adapter, AdapterError, AdapterFactory, AdapterKind, AdapterOptions, AdapterResult,
    GroupCapability, ManagerCapability, MessageCapability, Operation, PersonCapability,
    PropertiesCapability, QrCode,
};

/// 1x1 PNG served as the mock sign-in QR code.
const MOCK_QR_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Construction index of the adapter that made the call.
    pub adapter: usize,
    pub token: String,
    pub message: String,
}

/// Shared, append-only record of mock adapter calls.
#[derive(Debug, Clone, Default)]
pub struct MockJournal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl MockJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, adapter: usize, token: &str, message: String) {
        tracing::info!("MOCK MESSAGE => Token<{}>: {}", token, message);
        self.entries.lock().push(JournalEntry {
            adapter,
            token: token.to_string(),
            message,
        });
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().clone()
    }

    /// Messages recorded for one token, oldest first.
    pub fn messages_for(&self, token: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.token == token)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn contains(&self, token: &str, message: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.token == token && e.message == message)
    }

    /// Construction indexes of the adapters that have been quit.
    pub fn quit_adapters(&self) -> BTreeSet<usize> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.message == "[quit]")
            .map(|e| e.adapter)
            .collect()
    }
}

/// What an injected failure looks like to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// `AdapterError::Failed` for the operation, with the default message.
    Domain,
    /// `AdapterError::Other`, outside any command's expected failures.
    Unexpected,
    /// The call panics.
    Panic,
}

/// Holds calls to one operation until the test hands out a permit.
type Gate = Arc<Mutex<Receiver<()>>>;

/// Builds [`MockAdapter`]s that share one journal and failure table.
#[derive(Debug, Clone, Default)]
pub struct MockAdapterFactory {
    journal: MockJournal,
    created: Arc<AtomicUsize>,
    failures: Arc<HashMap<Operation, InjectedFailure>>,
    gates: Arc<HashMap<Operation, Gate>>,
}

impl MockAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every adapter built by this factory fail `operation`.
    pub fn with_failure(mut self, operation: Operation, failure: InjectedFailure) -> Self {
        Arc::make_mut(&mut self.failures).insert(operation, failure);
        self
    }

    /// Make every call to `operation` wait for one `()` on `permits`.
    /// Calls go through once the sender is dropped.
    pub fn with_gate(mut self, operation: Operation, permits: Receiver<()>) -> Self {
        Arc::make_mut(&mut self.gates).insert(operation, Arc::new(Mutex::new(permits)));
        self
    }

    pub fn journal(&self) -> MockJournal {
        self.journal.clone()
    }

    /// Number of adapters constructed so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl AdapterFactory for MockAdapterFactory {
    fn create(
        &self,
        token: &str,
        options: &AdapterOptions,
    ) -> AdapterResult<Option<Box<dyn Adapter>>> {
        let id = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(MockAdapter {
            id,
            token: token.to_string(),
            journal: self.journal.clone(),
            failures: self.failures.clone(),
            gates: self.gates.clone(),
            timeout: Mutex::new(options.timeout),
        })))
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Mock
    }
}

pub struct MockAdapter {
    id: usize,
    token: String,
    journal: MockJournal,
    failures: Arc<HashMap<Operation, InjectedFailure>>,
    gates: Arc<HashMap<Operation, Gate>>,
    timeout: Mutex<Duration>,
}

impl MockAdapter {
    fn show(&self, message: String) {
        self.journal.record(self.id, &self.token, message);
    }

    fn check(&self, operation: Operation) -> AdapterResult<()> {
        if let Some(gate) = self.gates.get(&operation) {
            let _ = gate.lock().recv();
        }
        match self.failures.get(&operation) {
            None => Ok(()),
            Some(InjectedFailure::Domain) => Err(AdapterError::failed(operation)),
            Some(InjectedFailure::Unexpected) => Err(AdapterError::Other(format!(
                "mock driver fault during {}",
                operation.label()
            ))),
            Some(InjectedFailure::Panic) => panic!("mock driver panicked during {}", operation.label()),
        }
    }

    pub fn timeout(&self) -> Duration {
        *self.timeout.lock()
    }
}

impl Adapter for MockAdapter {
    fn message(&self) -> &dyn MessageCapability {
        self
    }

    fn group(&self) -> &dyn GroupCapability {
        self
    }

    fn person(&self) -> &dyn PersonCapability {
        self
    }

    fn manager(&self) -> &dyn ManagerCapability {
        self
    }

    fn properties(&self) -> &dyn PropertiesCapability {
        self
    }
}

impl MessageCapability for MockAdapter {
    fn send_message(&self, name: &str, message: &str) -> AdapterResult<bool> {
        self.check(Operation::SendMessage)?;
        self.show(format!("[send_message] name: {}, message: {}", name, message));
        Ok(true)
    }

    fn send_blind_message(&self, message: &str) -> AdapterResult<bool> {
        self.check(Operation::SendBlindMessage)?;
        self.show(format!("[send_blind_message] message: {}", message));
        Ok(true)
    }

    fn send_anon_message(&self, phone: &str, text: &str) -> AdapterResult<bool> {
        self.check(Operation::SendAnonMessage)?;
        self.show(format!("[send_anon_message] phone: {}, text: {}", phone, text));
        Ok(true)
    }

    fn send_picture(
        &self,
        name: &str,
        picture_location: &str,
        caption: Option<&str>,
    ) -> AdapterResult<bool> {
        self.check(Operation::SendPicture)?;
        self.show(format!(
            "[send_picture] name: {}, picture_location: {}, caption: {}",
            name,
            picture_location,
            caption.unwrap_or("")
        ));
        Ok(true)
    }

    fn send_document(&self, name: &str, document_location: &str) -> AdapterResult<bool> {
        self.check(Operation::SendDocument)?;
        self.show(format!(
            "[send_document] name: {}, document_location: {}",
            name, document_location
        ));
        Ok(true)
    }

    fn get_last_message_for(&self, name: &str) -> AdapterResult<Vec<String>> {
        self.check(Operation::LastMessage)?;
        self.show(format!("[get_last_message_for] name: {}", name));
        Ok(Vec::new())
    }

    fn is_message_present(&self, username: &str, message: &str) -> AdapterResult<bool> {
        self.check(Operation::MessagePresent)?;
        self.show(format!(
            "[is_message_present] username: {}, message: {}",
            username, message
        ));
        Ok(false)
    }

    fn get_starred_messages(&self, delay: Duration) -> AdapterResult<Vec<String>> {
        self.check(Operation::StarredMessages)?;
        self.show(format!("[get_starred_messages] delay: {}", delay.as_secs()));
        Ok(vec![
            "Starred Message 01".to_string(),
            "Starred Message 02".to_string(),
        ])
    }
}

impl GroupCapability for MockAdapter {
    fn participants_count(&self, group_name: &str) -> AdapterResult<u64> {
        self.check(Operation::GroupParticipantCount)?;
        self.show(format!("[participants_count] group_name: {}", group_name));
        Ok(3)
    }

    fn get_participants(&self, group_name: &str) -> AdapterResult<Vec<String>> {
        self.check(Operation::GroupParticipants)?;
        self.show(format!("[get_participants] group_name: {}", group_name));
        Ok((0..3).map(|i| format!("Participant {}", i)).collect())
    }

    fn create_group(
        &self,
        group_name: &str,
        members: &[String],
        picture_location: Option<&str>,
    ) -> AdapterResult<bool> {
        self.check(Operation::CreateGroup)?;
        self.show(format!(
            "[create_group] group_name: {}, members: [{}], picture_location: {}",
            group_name,
            members.join(", "),
            picture_location.unwrap_or("")
        ));
        Ok(true)
    }

    fn join_group(&self, invite_link: &str) -> AdapterResult<bool> {
        self.check(Operation::JoinGroup)?;
        self.show(format!("[join_group] invite_link: {}", invite_link));
        Ok(true)
    }

    fn get_invite_link(&self, group_name: &str) -> AdapterResult<String> {
        self.check(Operation::GetInviteLink)?;
        self.show(format!("[get_invite_link] group_name: {}", group_name));
        Ok("https://chat.example.com/invite/group_registration_link".to_string())
    }

    fn exit_group(&self, group_name: &str) -> AdapterResult<bool> {
        self.check(Operation::ExitGroup)?;
        self.show(format!("[exit_group] group_name: {}", group_name));
        Ok(true)
    }

    fn rename(&self, old_name: &str, new_name: &str) -> AdapterResult<bool> {
        self.check(Operation::RenameGroup)?;
        self.show(format!("[rename] old_name: {}, new_name: {}", old_name, new_name));
        Ok(true)
    }

    fn set_picture(&self, group_name: &str, picture_location: &str) -> AdapterResult<bool> {
        self.check(Operation::SetGroupPicture)?;
        self.show(format!(
            "[set_picture] group_name: {}, picture_location: {}",
            group_name, picture_location
        ));
        Ok(true)
    }

    fn only_admins_send_messages(&self, group_name: &str) -> AdapterResult<bool> {
        self.check(Operation::OnlyAdminsSendMessages)?;
        self.show(format!("[only_admins_send_messages] group_name: {}", group_name));
        Ok(true)
    }

    fn all_users_send_messages(&self, group_name: &str) -> AdapterResult<bool> {
        self.check(Operation::AllUsersSendMessages)?;
        self.show(format!("[all_users_send_messages] group_name: {}", group_name));
        Ok(true)
    }

    fn only_admins_change_group_data(&self, group_name: &str) -> AdapterResult<bool> {
        self.check(Operation::OnlyAdminsChangeGroupData)?;
        self.show(format!(
            "[only_admins_change_group_data] group_name: {}",
            group_name
        ));
        Ok(true)
    }

    fn all_users_change_group_data(&self, group_name: &str) -> AdapterResult<bool> {
        self.check(Operation::AllUsersChangeGroupData)?;
        self.show(format!("[all_users_change_group_data] group_name: {}", group_name));
        Ok(true)
    }
}

impl PersonCapability for MockAdapter {
    fn get_status(&self, name: &str) -> AdapterResult<String> {
        self.check(Operation::GetStatus)?;
        let msg = format!("[get_status] name: {}", name);
        self.show(msg.clone());
        Ok(msg)
    }

    fn get_last_seen(&self, name: &str, timeout: Duration) -> AdapterResult<String> {
        self.check(Operation::GetLastSeen)?;
        let msg = format!("[get_last_seen] name: {}, timeout: {}", name, timeout.as_secs());
        self.show(msg.clone());
        Ok(msg)
    }
}

impl ManagerCapability for MockAdapter {
    fn goto_home(&self) -> AdapterResult<bool> {
        self.check(Operation::GotoHome)?;
        self.show("[goto_home]".to_string());
        Ok(true)
    }

    fn clear_chat(&self, name: &str) -> AdapterResult<bool> {
        self.check(Operation::ClearChat)?;
        self.show(format!("[clear_chat] name: {}", name));
        Ok(true)
    }

    fn override_timeout(&self, new_timeout: Duration) -> AdapterResult<bool> {
        self.check(Operation::OverrideTimeout)?;
        *self.timeout.lock() = new_timeout;
        Ok(true)
    }

    fn get_profile_pic(&self, name: &str) -> AdapterResult<bool> {
        self.check(Operation::ProfilePicture)?;
        self.show(format!("[get_profile_pic] name: {}", name));
        Ok(true)
    }

    fn unread_user_names(&self, scrolls: u32) -> AdapterResult<Vec<String>> {
        self.check(Operation::UnreadUserNames)?;
        self.show(format!("[unread_user_names] scrolls: {}", scrolls));
        Ok(vec!["User 1".to_string(), "User 2".to_string()])
    }

    fn get_driver(&self) -> AdapterResult<Option<String>> {
        self.check(Operation::Driver)?;
        Ok(None)
    }

    fn quit(&self) -> AdapterResult<bool> {
        self.check(Operation::Quit)?;
        self.show("[quit]".to_string());
        Ok(true)
    }
}

impl PropertiesCapability for MockAdapter {
    fn get_qrcode(&self) -> AdapterResult<QrCode> {
        self.check(Operation::GetQrCode)?;
        let mut id = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut id);
        let hex: String = id.iter().map(|b| format!("{:02x}", b)).collect();
        // Round-trip through the engine so the payload is guaranteed valid base64.
        let image = STANDARD
            .decode(MOCK_QR_PNG)
            .map(|png| STANDARD.encode(png))
            .map_err(|e| AdapterError::Other(e.to_string()))?;
        self.show("[get_qrcode]".to_string());
        Ok(QrCode {
            file_name: format!("qrcode_{}.png", hex),
            image,
        })
    }

    fn check_point(&self) -> AdapterResult<bool> {
        self.check(Operation::CheckPoint)?;
        self.show("[check_point]".to_string());
        Ok(true)
    }

    fn is_connected(&self) -> AdapterResult<bool> {
        self.check(Operation::ConnectionLost)?;
        self.check(Operation::IsConnected)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(factory: &MockAdapterFactory, token: &str) -> Box<dyn Adapter> {
        factory
            .create(token, &AdapterOptions::default())
            .unwrap()
            .expect("mock always provides an adaptee")
    }

    #[test]
    fn calls_are_journaled_per_token() {
        let factory = MockAdapterFactory::new();
        let a = build(&factory, "a");
        let b = build(&factory, "b");

        a.message().send_message("Alice", "Hello").unwrap();
        b.group().join_group("https://link").unwrap();

        let journal = factory.journal();
        assert_eq!(
            journal.messages_for("a"),
            vec!["[send_message] name: Alice, message: Hello"]
        );
        assert_eq!(
            journal.messages_for("b"),
            vec!["[join_group] invite_link: https://link"]
        );
        assert_eq!(factory.created(), 2);
    }

    #[test]
    fn injected_domain_failure_uses_operation_message() {
        let factory =
            MockAdapterFactory::new().with_failure(Operation::RenameGroup, InjectedFailure::Domain);
        let adapter = build(&factory, "t");
        let err = adapter.group().rename("old", "new").unwrap_err();
        assert_eq!(err, AdapterError::failed(Operation::RenameGroup));
        assert!(factory.journal().entries().is_empty());
    }

    #[test]
    fn injected_unexpected_failure_has_no_operation() {
        let factory = MockAdapterFactory::new()
            .with_failure(Operation::SendMessage, InjectedFailure::Unexpected);
        let adapter = build(&factory, "t");
        let err = adapter.message().send_message("x", "y").unwrap_err();
        assert_eq!(err.operation(), None);
    }

    #[test]
    fn connection_lost_surfaces_from_is_connected() {
        let factory = MockAdapterFactory::new()
            .with_failure(Operation::ConnectionLost, InjectedFailure::Domain);
        let adapter = build(&factory, "t");
        let err = adapter.properties().is_connected().unwrap_err();
        assert_eq!(err.operation(), Some(Operation::ConnectionLost));
    }

    #[test]
    fn qrcode_has_png_file_name_and_base64_image() {
        let factory = MockAdapterFactory::new();
        let adapter = build(&factory, "t");
        let qr = adapter.properties().get_qrcode().unwrap();
        assert!(qr.file_name.starts_with("qrcode_"));
        assert!(qr.file_name.ends_with(".png"));
        assert_eq!(qr.file_name.len(), "qrcode_".len() + 16 + ".png".len());
        let png = STANDARD.decode(&qr.image).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn quit_is_recorded_per_adapter() {
        let factory = MockAdapterFactory::new();
        let first = build(&factory, "t");
        let second = build(&factory, "t");
        second.manager().quit().unwrap();
        second.manager().quit().unwrap();
        first.properties().check_point().unwrap();

        let quit: Vec<usize> = factory.journal().quit_adapters().into_iter().collect();
        assert_eq!(quit, vec![1]);
    }

    #[test]
    fn gated_operation_waits_for_permit() {
        let (permit, permits) = std::sync::mpsc::channel();
        let factory = MockAdapterFactory::new().with_gate(Operation::Quit, permits);
        let adapter = build(&factory, "t");

        let journal = factory.journal();
        let handle = std::thread::spawn(move || adapter.manager().quit());
        std::thread::sleep(Duration::from_millis(50));
        assert!(journal.entries().is_empty());

        permit.send(()).unwrap();
        assert_eq!(handle.join().unwrap(), Ok(true));
        assert!(journal.contains("t", "[quit]"));
    }

    #[test]
    fn override_timeout_is_kept() {
        let factory = MockAdapterFactory::new();
        let adapter = MockAdapter {
            id: 0,
            token: "t".to_string(),
            journal: factory.journal(),
            failures: Arc::new(HashMap::new()),
            gates: Arc::new(HashMap::new()),
            timeout: Mutex::new(AdapterOptions::DEFAULT_TIMEOUT),
        };
        adapter.manager().override_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(adapter.timeout(), Duration::from_secs(5));
    }
}
