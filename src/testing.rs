//! In-memory fakes shared by the unit tests

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read};
use std::rc::Rc;

use crate::auth::{Credential, CredentialSource};
use crate::drive::{Connector, EntryKind, Page, RemoteEntry, RemoteStore};
use crate::error::{BackupError, BackupResult};
use crate::notify::Notifier;

#[derive(Default)]
struct DriveState {
    children: HashMap<String, Vec<RemoteEntry>>,
    content: HashMap<String, Vec<u8>>,
    fail_open: HashSet<String>,
    fail_midway: HashSet<String>,
    fail_list: HashSet<String>,
    opens: HashMap<String, usize>,
    page_size: usize,
}

/// Remote tree kept in memory, with failure injection per file or folder
#[derive(Clone)]
pub struct FakeDrive {
    state: Rc<RefCell<DriveState>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        let state = DriveState {
            page_size: 2,
            ..Default::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.borrow_mut().page_size = page_size.max(1);
        self
    }

    pub fn add_folder(&self, parent: &str, id: &str, name: &str) -> RemoteEntry {
        let entry = RemoteEntry::folder(id, name);
        self.state
            .borrow_mut()
            .children
            .entry(parent.to_string())
            .or_default()
            .push(entry.clone());
        entry
    }

    pub fn add_file(&self, parent: &str, id: &str, name: &str, content: Vec<u8>) -> RemoteEntry {
        let entry = RemoteEntry::file(id, name, Some(content.len() as u64));
        let mut state = self.state.borrow_mut();
        state
            .children
            .entry(parent.to_string())
            .or_default()
            .push(entry.clone());
        state.content.insert(id.to_string(), content);
        entry
    }

    /// Opening this file fails before any byte is transferred
    pub fn fail_open(&self, id: &str) {
        self.state.borrow_mut().fail_open.insert(id.to_string());
    }

    /// The stream for this file breaks after the first few bytes
    pub fn fail_midway(&self, id: &str) {
        self.state.borrow_mut().fail_midway.insert(id.to_string());
    }

    /// Listing this folder fails
    pub fn fail_list(&self, folder_id: &str) {
        self.state.borrow_mut().fail_list.insert(folder_id.to_string());
    }

    pub fn open_count(&self, id: &str) -> usize {
        self.state.borrow().opens.get(id).copied().unwrap_or(0)
    }

    pub fn total_opens(&self) -> usize {
        self.state.borrow().opens.values().sum()
    }
}

impl RemoteStore for FakeDrive {
    fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> BackupResult<Page> {
        let state = self.state.borrow();
        if state.fail_list.contains(folder_id) {
            return Err(BackupError::Http(format!("listing {} failed", folder_id)));
        }

        let all = state.children.get(folder_id).cloned().unwrap_or_default();
        let start: usize = page_token.map_or(0, |t| t.parse().unwrap_or(0));
        let end = (start + state.page_size).min(all.len());
        let next_page_token = (end < all.len()).then(|| end.to_string());

        Ok(Page {
            entries: all[start.min(all.len())..end].to_vec(),
            next_page_token,
        })
    }

    fn open(&self, entry: &RemoteEntry) -> BackupResult<Box<dyn Read + '_>> {
        assert_eq!(entry.kind, EntryKind::File, "folders are never opened");
        let mut state = self.state.borrow_mut();
        *state.opens.entry(entry.id.clone()).or_default() += 1;

        if state.fail_open.contains(&entry.id) {
            return Err(BackupError::Http(format!("403 for {}", entry.id)));
        }
        let content = state.content.get(&entry.id).cloned().unwrap_or_default();
        if state.fail_midway.contains(&entry.id) {
            return Ok(Box::new(BrokenReader {
                head: Cursor::new(content.into_iter().take(4).collect()),
            }));
        }
        Ok(Box::new(Cursor::new(content)))
    }
}

impl Connector for FakeDrive {
    fn connect(&self, _credential: &Credential) -> BackupResult<Box<dyn RemoteStore>> {
        Ok(Box::new(self.clone()))
    }
}

/// Yields a few bytes, then fails
struct BrokenReader {
    head: Cursor<Vec<u8>>,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.head.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            n => Ok(n),
        }
    }
}

/// Notifier that remembers every message
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Rc<RefCell<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn subjects(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|(_, b)| b.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, subject: &str, body: &str) {
        self.sent
            .borrow_mut()
            .push((subject.to_string(), body.to_string()));
    }
}

/// Credential source with a fixed answer
pub struct StaticCredentials {
    pub fail: bool,
}

impl CredentialSource for StaticCredentials {
    fn obtain(&self, _notifier: &dyn Notifier) -> BackupResult<Credential> {
        if self.fail {
            return Err(BackupError::AuthRequired("no terminal".into()));
        }
        Ok(Credential::new("token", None, None))
    }
}
