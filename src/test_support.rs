//! In-crate test doubles for the git and prompt capabilities.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use crate::defaults::GIT_DIR_NAME;
use crate::error::{Error, Result};
use crate::filesystem::{FileSystem, MemoryFS};
use crate::prompt::Prompt;
use crate::repository::GitOperations;

#[derive(Default)]
struct MockGitState {
    registered: BTreeSet<String>,
    /// Files a mirror checks out on add/update, keyed by mirror path.
    upstream: BTreeMap<String, Vec<(String, String)>>,
    checked_out: BTreeMap<String, Vec<(String, String)>>,
    heads: BTreeMap<String, String>,
    behind: BTreeMap<String, Option<u32>>,
    fail_add: BTreeSet<String>,
    fail_remove: BTreeSet<String>,
    fail_checkout: BTreeSet<String>,
    fail_update: BTreeSet<String>,
    fail_fetch: BTreeSet<String>,
    revision_seq: u32,
    calls: Vec<String>,
}

impl MockGitState {
    fn next_revision(&mut self, path: &str) -> String {
        self.revision_seq += 1;
        let sha = format!("{:040x}", self.revision_seq);
        self.heads.insert(path.to_string(), sha.clone());
        sha
    }
}

/// Simulates submodule checkouts inside a shared [`MemoryFS`].
pub struct MockGit {
    fs: MemoryFS,
    state: RefCell<MockGitState>,
}

impl MockGit {
    pub fn new(fs: MemoryFS) -> Self {
        Self {
            fs,
            state: RefCell::new(MockGitState::default()),
        }
    }

    /// Mark `path` as registered and check out `files` under it.
    pub fn register(&self, path: &str, files: &[(&str, &str)]) {
        self.state.borrow_mut().registered.insert(path.to_string());
        self.checkout(path, &owned(files));
    }

    /// Mark `path` as registered but leave only an empty directory, as a
    /// clone without `--recurse-submodules` does.
    pub fn register_without_checkout(&self, path: &str) {
        self.state.borrow_mut().registered.insert(path.to_string());
        self.fs.create_dir_all(Path::new(path)).unwrap();
    }

    /// Content that add/update will check out at `path` from now on.
    pub fn set_upstream(&self, path: &str, files: &[(&str, &str)]) {
        self.state
            .borrow_mut()
            .upstream
            .insert(path.to_string(), owned(files));
    }

    pub fn set_behind(&self, path: &str, behind: Option<u32>) {
        self.state
            .borrow_mut()
            .behind
            .insert(path.to_string(), behind);
    }

    pub fn fail_add(&self, path: &str) {
        self.state.borrow_mut().fail_add.insert(path.to_string());
    }

    pub fn fail_remove(&self, path: &str) {
        self.state.borrow_mut().fail_remove.insert(path.to_string());
    }

    pub fn fail_checkout(&self, path: &str) {
        self.state.borrow_mut().fail_checkout.insert(path.to_string());
    }

    pub fn fail_update(&self, path: &str) {
        self.state.borrow_mut().fail_update.insert(path.to_string());
    }

    pub fn fail_fetch(&self, path: &str) {
        self.state.borrow_mut().fail_fetch.insert(path.to_string());
    }

    pub fn is_registered(&self, path: &str) -> bool {
        self.state.borrow().registered.contains(path)
    }

    pub fn head(&self, path: &str) -> Option<String> {
        self.state.borrow().heads.get(path).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn fetch_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("fetch "))
            .collect()
    }

    /// add / remove / checkout / update calls, in order.
    pub fn mutation_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| {
                c.starts_with("add ")
                    || c.starts_with("remove ")
                    || c.starts_with("checkout ")
                    || c.starts_with("update ")
            })
            .collect()
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }

    fn checkout(&self, path: &str, files: &[(String, String)]) {
        let dir = Path::new(path);
        if self.fs.exists(dir) {
            self.fs.remove_dir_all(dir).unwrap();
        }
        self.fs.create_dir_all(dir).unwrap();
        self.fs
            .add_file_string(
                dir.join(GIT_DIR_NAME),
                &format!("gitdir: ../../.git/modules/{}", path),
            )
            .unwrap();
        for (file, content) in files {
            self.fs.add_file_string(dir.join(file), content).unwrap();
        }
        let mut state = self.state.borrow_mut();
        state.checked_out.insert(path.to_string(), files.to_vec());
        state.next_revision(path);
    }

    fn is_checkout(&self, path: &str) -> bool {
        self.fs.exists(&Path::new(path).join(GIT_DIR_NAME))
    }

    fn require_checkout(&self, command: &str, path: &str) -> Result<()> {
        if self.is_checkout(path) {
            Ok(())
        } else {
            Err(Self::failure(command, path))
        }
    }

    fn failure(command: &str, path: &str) -> Error {
        Error::GitCommand {
            command: command.to_string(),
            path: path.to_string(),
            stderr: "simulated failure".to_string(),
        }
    }
}

fn owned(files: &[(&str, &str)]) -> Vec<(String, String)> {
    files
        .iter()
        .map(|(f, c)| (f.to_string(), c.to_string()))
        .collect()
}

impl GitOperations for MockGit {
    fn registered_mirrors(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().registered.iter().cloned().collect())
    }

    fn add_mirror(&self, url: &str, path: &str) -> Result<()> {
        self.record(format!("add {} {}", path, url));
        if self.state.borrow().fail_add.contains(path) {
            return Err(Self::failure("submodule add", path));
        }
        let files = self
            .state
            .borrow()
            .upstream
            .get(path)
            .cloned()
            .unwrap_or_else(|| vec![("README.md".to_string(), url.to_string())]);
        self.state.borrow_mut().registered.insert(path.to_string());
        self.checkout(path, &files);
        Ok(())
    }

    fn remove_mirror(&self, path: &str) -> Result<()> {
        self.record(format!("remove {}", path));
        if self.state.borrow().fail_remove.contains(path) {
            return Err(Self::failure("rm", path));
        }
        let mut state = self.state.borrow_mut();
        state.registered.remove(path);
        state.heads.remove(path);
        state.checked_out.remove(path);
        drop(state);
        if self.fs.exists(Path::new(path)) {
            self.fs.remove_dir_all(Path::new(path))?;
        }
        Ok(())
    }

    fn checkout_mirror(&self, path: &str) -> Result<()> {
        self.record(format!("checkout {}", path));
        let state = self.state.borrow();
        if state.fail_checkout.contains(path) || !state.registered.contains(path) {
            return Err(Self::failure("submodule update --init", path));
        }
        let files = state
            .checked_out
            .get(path)
            .or_else(|| state.upstream.get(path))
            .cloned()
            .unwrap_or_else(|| vec![("README.md".to_string(), path.to_string())]);
        drop(state);
        self.checkout(path, &files);
        Ok(())
    }

    fn update_mirror(&self, path: &str) -> Result<()> {
        self.record(format!("update {}", path));
        let state = self.state.borrow();
        if state.fail_update.contains(path) || !state.registered.contains(path) {
            return Err(Self::failure("submodule update", path));
        }
        let files = state
            .upstream
            .get(path)
            .filter(|files| state.checked_out.get(path) != Some(*files))
            .cloned();
        drop(state);
        // no new upstream content: the checkout and its head stay as they are
        if let Some(files) = files {
            self.checkout(path, &files);
        } else if !self.is_checkout(path) {
            // `--init` checks out a registered mirror that has no working copy
            self.checkout(path, &[("README.md".to_string(), path.to_string())]);
        }
        Ok(())
    }

    fn fetch(&self, path: &str) -> Result<()> {
        self.record(format!("fetch {}", path));
        if self.state.borrow().fail_fetch.contains(path) {
            return Err(Self::failure("fetch", path));
        }
        self.require_checkout("fetch", path)
    }

    fn commits_behind(&self, path: &str) -> Result<Option<u32>> {
        self.require_checkout("rev-list", path)?;
        Ok(self
            .state
            .borrow()
            .behind
            .get(path)
            .copied()
            .unwrap_or(Some(0)))
    }

    fn head_revision(&self, path: &str) -> Result<Option<String>> {
        if !self.is_checkout(path) {
            return Ok(None);
        }
        Ok(self.head(path))
    }
}

/// A pre-recorded answer for [`ScriptedPrompt`].
#[derive(Debug, Clone)]
pub enum Answer {
    Confirm(Option<bool>),
    MultiSelect(Option<Vec<usize>>),
    Select(Option<usize>),
}

/// Replays answers in order and records every question asked.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: RefCell<VecDeque<Answer>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    fn next(&self, message: &str) -> Answer {
        self.asked.borrow_mut().push(message.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected prompt: {}", message))
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, message: &str) -> Result<Option<bool>> {
        match self.next(message) {
            Answer::Confirm(answer) => Ok(answer),
            other => panic!("expected confirm for '{}', scripted {:?}", message, other),
        }
    }

    fn multi_select(&self, message: &str, _items: &[String]) -> Result<Option<Vec<usize>>> {
        match self.next(message) {
            Answer::MultiSelect(answer) => Ok(answer),
            other => panic!("expected multi-select for '{}', scripted {:?}", message, other),
        }
    }

    fn select(&self, message: &str, _items: &[String]) -> Result<Option<usize>> {
        match self.next(message) {
            Answer::Select(answer) => Ok(answer),
            other => panic!("expected select for '{}', scripted {:?}", message, other),
        }
    }
}
