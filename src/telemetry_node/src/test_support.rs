//! In-memory board doubles. Each double is a cheap handle over shared state so
//! a test can keep one clone while the loop owns the other.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use cubesat_board::{
    IndicatorServices, NetworkError, NetworkServices, StorageError, StorageServices,
    SystemServices,
};

pub const EPOCH_AT_BOOT: i64 = 1_700_000_000;

#[derive(Default)]
struct SystemState {
    millis: u64,
    panic_on_delay: bool,
}

#[derive(Clone, Default)]
pub struct SimulatedSystem {
    state: Rc<RefCell<SystemState>>,
}

impl SimulatedSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.state.borrow().millis
    }

    pub fn advance(&self, ms: u64) {
        self.state.borrow_mut().millis += ms;
    }

    pub fn panic_on_delay(&self) {
        self.state.borrow_mut().panic_on_delay = true;
    }
}

impl SystemServices for SimulatedSystem {
    fn get_millis(&mut self) -> u64 {
        self.now()
    }

    fn epoch_timestamp(&mut self) -> i64 {
        EPOCH_AT_BOOT + (self.now() / 1000) as i64
    }

    fn delay_ms(&mut self, ms: u32) {
        if self.state.borrow().panic_on_delay {
            panic!("delay interrupted");
        }
        self.advance(ms as u64);
    }

    fn reset(&mut self) -> ! {
        panic!("hard reset");
    }
}

#[derive(Default)]
struct StorageState {
    files: BTreeMap<String, Vec<u8>>,
    mounted: bool,
    mount_fails: bool,
    torn_next_append: Option<usize>,
    appends_fail: bool,
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Rc<RefCell<StorageState>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, file_name: &str, bytes: &[u8]) {
        self.state
            .borrow_mut()
            .files
            .insert(String::from(file_name), bytes.to_vec());
    }

    pub fn contents(&self, file_name: &str) -> Vec<u8> {
        self.state
            .borrow()
            .files
            .get(file_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.state.borrow().files.keys().cloned().collect()
    }

    pub fn fail_mount(&self) {
        self.state.borrow_mut().mount_fails = true;
    }

    /// The next append writes `written` bytes and then fails.
    pub fn fail_next_append(&self, written: usize) {
        self.state.borrow_mut().torn_next_append = Some(written);
    }

    pub fn fail_appends(&self, fail: bool) {
        self.state.borrow_mut().appends_fail = fail;
    }
}

impl StorageServices for MemoryStorage {
    fn mount(&mut self) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        if state.mount_fails {
            return Err(StorageError::MountFailed);
        }
        state.mounted = true;
        Ok(())
    }

    fn is_mounted(&self) -> bool {
        self.state.borrow().mounted
    }

    fn append(&mut self, file_name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        if !state.mounted {
            return Err(StorageError::NotMounted);
        }
        if state.appends_fail {
            return Err(StorageError::Io);
        }
        let torn = state.torn_next_append.take();
        let file = state.files.entry(String::from(file_name)).or_default();
        match torn {
            Some(written) => {
                file.extend_from_slice(&bytes[..written.min(bytes.len())]);
                Err(StorageError::Io)
            }
            None => {
                file.extend_from_slice(bytes);
                Ok(())
            }
        }
    }

    fn last_byte(&mut self, file_name: &str) -> Result<Option<u8>, StorageError> {
        match self.state.borrow().files.get(file_name) {
            Some(file) => Ok(file.last().copied()),
            None => Err(StorageError::NotFound),
        }
    }

    fn read(&mut self, file_name: &str) -> Result<Vec<u8>, StorageError> {
        self.state
            .borrow()
            .files
            .get(file_name)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn list_files(&mut self) -> Result<Vec<String>, StorageError> {
        Ok(self.file_names())
    }

    fn remove(&mut self, file_name: &str) -> Result<(), StorageError> {
        match self.state.borrow_mut().files.remove(file_name) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedRequest {
    pub url: String,
    pub content_type: String,
    pub body: String,
    pub timeout_ms: u32,
}

#[derive(Default)]
struct NetworkState {
    responses: VecDeque<Result<u16, NetworkError>>,
    posts: Vec<PostedRequest>,
    association: Option<(String, String)>,
    polls_until_associated: u32,
    latency: Option<(SimulatedSystem, u64)>,
}

#[derive(Clone, Default)]
pub struct MockNetwork {
    state: Rc<RefCell<NetworkState>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result of a future post. With nothing queued a post answers 200.
    pub fn respond(&self, response: Result<u16, NetworkError>) {
        self.state.borrow_mut().responses.push_back(response);
    }

    pub fn posts(&self) -> Vec<PostedRequest> {
        self.state.borrow().posts.clone()
    }

    pub fn association(&self) -> Option<(String, String)> {
        self.state.borrow().association.clone()
    }

    pub fn associate_after(&self, polls: u32) {
        self.state.borrow_mut().polls_until_associated = polls;
    }

    /// Every post advances `clock` by `ms`.
    pub fn with_latency(&self, clock: &SimulatedSystem, ms: u64) {
        self.state.borrow_mut().latency = Some((clock.clone(), ms));
    }
}

impl NetworkServices for MockNetwork {
    fn begin_association(&mut self, ssid: &str, secret: &str) -> Result<(), NetworkError> {
        self.state.borrow_mut().association = Some((String::from(ssid), String::from(secret)));
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.association.is_none() {
            return false;
        }
        if state.polls_until_associated > 0 {
            state.polls_until_associated -= 1;
            return false;
        }
        true
    }

    fn post(
        &mut self,
        url: &str,
        content_type: &str,
        body: &[u8],
        timeout_ms: u32,
    ) -> Result<u16, NetworkError> {
        let mut state = self.state.borrow_mut();
        state.posts.push(PostedRequest {
            url: String::from(url),
            content_type: String::from(content_type),
            body: String::from_utf8_lossy(body).into_owned(),
            timeout_ms,
        });
        if let Some((clock, ms)) = &state.latency {
            clock.advance(*ms);
        }
        state.responses.pop_front().unwrap_or(Ok(200))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndicatorEvent {
    On(u32, u16),
    Off,
}

#[derive(Default)]
struct IndicatorState {
    events: Vec<IndicatorEvent>,
    on: bool,
}

#[derive(Clone, Default)]
pub struct MockIndicator {
    state: Rc<RefCell<IndicatorState>>,
}

impl MockIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<IndicatorEvent> {
        self.state.borrow().events.clone()
    }

    pub fn is_on(&self) -> bool {
        self.state.borrow().on
    }

    pub fn pulse_count(&self) -> usize {
        self.events_at(None)
    }

    /// Pulses sounded at `freq_hz`, or all pulses for `None`.
    pub fn events_at(&self, freq_hz: Option<u32>) -> usize {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|event| match (event, freq_hz) {
                (IndicatorEvent::On(_, _), None) => true,
                (IndicatorEvent::On(freq, _), Some(wanted)) => *freq == wanted,
                _ => false,
            })
            .count()
    }

    pub fn clear(&self) {
        self.state.borrow_mut().events.clear();
    }
}

impl IndicatorServices for MockIndicator {
    fn tone_on(&mut self, freq_hz: u32, duty: u16) {
        let mut state = self.state.borrow_mut();
        state.events.push(IndicatorEvent::On(freq_hz, duty));
        state.on = true;
    }

    fn tone_off(&mut self) {
        let mut state = self.state.borrow_mut();
        state.events.push(IndicatorEvent::Off);
        state.on = false;
    }
}
