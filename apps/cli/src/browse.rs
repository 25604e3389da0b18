//! Interactive browse mode.

use std::path::{Path, PathBuf};

use thunderdrive_api::{Entry, EntryQuery};
use thunderdrive_sync::{BatchRunner, DriveConnection, RemoteFile, TransferTask, fetch_entries};
use thunderdrive_transfer::RetryPolicy;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{error, info};

use crate::output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Where the browser is: a listing, and optionally a file picked from it.
#[derive(Debug, Clone)]
struct Location {
    query: EntryQuery,
    name: String,
}

pub struct Browser<'a> {
    conn: &'a dyn DriveConnection,
    runner: &'a BatchRunner<'a>,
    policy: RetryPolicy,
    dest: PathBuf,
    here: Location,
    stack: Vec<Location>,
    items: Vec<Entry>,
    selected: Option<Entry>,
}

impl<'a> Browser<'a> {
    pub fn new(
        conn: &'a dyn DriveConnection,
        runner: &'a BatchRunner<'a>,
        policy: RetryPolicy,
        dest: &Path,
    ) -> Self {
        Self {
            conn,
            runner,
            policy,
            dest: dest.to_path_buf(),
            here: Location {
                query: EntryQuery::Root,
                name: "root".into(),
            },
            stack: Vec::new(),
            items: Vec::new(),
            selected: None,
        }
    }

    /// Reads commands from `input` until `q` or end of input.
    pub async fn run<R>(&mut self, input: &mut Lines<R>) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.reload().await;
        loop {
            self.print_menu();
            let Some(line) = input.next_line().await? else {
                break;
            };
            let cmd = line.trim();
            let flow = if cmd == "s" {
                println!("query: ");
                match input.next_line().await? {
                    Some(phrase) => self.search(phrase.trim()).await,
                    None => Flow::Quit,
                }
            } else {
                self.handle(cmd).await
            };
            if flow == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Executes one command other than `s`.
    pub async fn handle(&mut self, cmd: &str) -> Flow {
        match cmd {
            "q" => return Flow::Quit,
            "i" => match &self.selected {
                Some(entry) => {
                    for line in output::entry_info(entry) {
                        println!("{line}");
                    }
                }
                None => println!("no file selected"),
            },
            "D" => match &self.selected {
                Some(entry) => {
                    let task = TransferTask::Download {
                        file: RemoteFile::from(entry),
                        dest_dir: self.dest.clone(),
                    };
                    if let Err(e) = self.runner.run_one(&task).await {
                        error!(file = %entry.name, error = %e, "download failed");
                    }
                }
                None => println!("no file selected"),
            },
            "SDA" => {
                let report = self.runner.download_all(&self.items, &self.dest).await;
                info!(
                    completed = report.completed.len(),
                    failed = report.failed.len(),
                    "listing downloaded"
                );
            }
            "u" => match self.stack.pop() {
                Some(previous) => {
                    self.here = previous;
                    self.selected = None;
                    self.reload().await;
                }
                None => println!("already at the top"),
            },
            "" => {}
            other => self.select(other).await,
        }
        Flow::Continue
    }

    /// Lists search results for `phrase`.
    pub async fn search(&mut self, phrase: &str) -> Flow {
        if phrase.is_empty() {
            return Flow::Continue;
        }
        self.enter(Location {
            query: EntryQuery::Search(phrase.to_string()),
            name: format!("search: {phrase}"),
        });
        self.selected = None;
        self.reload().await;
        Flow::Continue
    }

    async fn select(&mut self, cmd: &str) {
        let picked = cmd
            .parse::<usize>()
            .ok()
            .and_then(|k| k.checked_sub(1))
            .and_then(|i| self.items.get(i))
            .cloned();
        let Some(entry) = picked else {
            println!("unknown command: {cmd}");
            return;
        };

        if entry.is_folder() {
            self.enter(Location {
                query: EntryQuery::Folder(entry.hash.clone()),
                name: entry.name.clone(),
            });
            self.selected = None;
            self.reload().await;
        } else {
            self.enter(Location {
                query: self.here.query.clone(),
                name: entry.name.clone(),
            });
            self.selected = Some(entry);
        }
    }

    fn enter(&mut self, next: Location) {
        let previous = std::mem::replace(&mut self.here, next);
        self.stack.push(previous);
    }

    async fn reload(&mut self) {
        match fetch_entries(self.conn, &self.here.query, None, &self.policy).await {
            Ok(items) => self.items = items,
            Err(e) => {
                error!(listing = %self.here.name, error = %e, "listing failed");
                self.items.clear();
            }
        }
    }

    fn print_menu(&self) {
        match &self.selected {
            Some(_) => {
                println!("file selected: {}", self.here.name);
                println!("i - info");
                println!("D - download");
            }
            None => {
                println!("folder selected: {}", self.here.name);
                output::print_entries(&self.items, self.conn.user_name());
                println!("SDA - download all files listed");
            }
        }
        println!("s - search");
        if !self.stack.is_empty() {
            println!("u - UP");
        }
        println!("q - quit");
        println!("cmd: ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use futures_util::stream;
    use thunderdrive_api::{ApiError, Download, EntriesPage, RemoteFolder, UploadStream};
    use thunderdrive_sync::TransferEngine;
    use thunderdrive_sync::connection::DriveFuture;
    use thunderdrive_transfer::{ProgressReporter, RestartFlag};
    use tokio::io::BufReader;

    /// Root holds a folder and a file; the folder holds one file.
    #[derive(Default)]
    struct Tree {
        queries: Mutex<Vec<EntryQuery>>,
        downloads: AtomicUsize,
    }

    fn entry(name: &str, kind: &str, hash: &str) -> Entry {
        Entry {
            name: name.into(),
            kind: kind.into(),
            hash: hash.into(),
            file_size: (kind != "folder").then_some(4),
            ..Default::default()
        }
    }

    impl DriveConnection for Tree {
        fn list_entries<'a>(
            &'a self,
            query: &'a EntryQuery,
            _page: u32,
        ) -> DriveFuture<'a, EntriesPage> {
            Box::pin(async move {
                self.queries.lock().unwrap().push(query.clone());
                let data = match query {
                    EntryQuery::Root => vec![entry("Docs", "folder", "fd"), entry("a.txt", "file", "ha")],
                    EntryQuery::Folder(h) if h == "fd" => vec![entry("inner.txt", "file", "hi")],
                    EntryQuery::Search(q) => vec![entry(&format!("{q}.txt"), "file", "hs")],
                    _ => Vec::new(),
                };
                Ok(EntriesPage {
                    data,
                    current_page: 1,
                    last_page: 1,
                })
            })
        }

        fn list_folders(&self) -> DriveFuture<'_, Vec<RemoteFolder>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn create_folder<'a>(&'a self, _name: &'a str, _parent_id: &'a str) -> DriveFuture<'a, ()> {
            Box::pin(async { Ok(()) })
        }

        fn upload<'a>(
            &'a self,
            _parent_id: &'a str,
            _file_name: &'a str,
            _len: u64,
            _body: UploadStream,
        ) -> DriveFuture<'a, ()> {
            Box::pin(async { Ok(()) })
        }

        fn download<'a>(&'a self, _hash: &'a str) -> DriveFuture<'a, Download> {
            Box::pin(async move {
                self.downloads.fetch_add(1, Ordering::SeqCst);
                let body = stream::iter(vec![Ok::<_, ApiError>(Bytes::from_static(b"data"))]);
                Ok(Download {
                    content_length: Some(4),
                    body: Box::pin(body),
                })
            })
        }

        fn user_name(&self) -> &str {
            "me"
        }
    }

    fn runner(tree: &Tree) -> BatchRunner<'_> {
        let engine = TransferEngine::new(tree, Arc::new(ProgressReporter::new(false)), RestartFlag::new());
        BatchRunner::new(engine, RetryPolicy::with_attempts(1))
    }

    #[tokio::test]
    async fn navigates_into_folder_and_back_up() {
        let tree = Tree::default();
        let runner = runner(&tree);
        let dir = tempfile::tempdir().unwrap();
        let mut b = Browser::new(&tree, &runner, RetryPolicy::with_attempts(1), dir.path());
        b.reload().await;
        assert_eq!(b.items.len(), 2);

        assert_eq!(b.handle("1").await, Flow::Continue);
        assert_eq!(b.here.name, "Docs");
        assert_eq!(b.items[0].name, "inner.txt");

        b.handle("u").await;
        assert_eq!(b.here.name, "root");
        assert_eq!(b.items.len(), 2);
        assert_eq!(
            *tree.queries.lock().unwrap(),
            vec![EntryQuery::Root, EntryQuery::Folder("fd".into()), EntryQuery::Root]
        );
    }

    #[tokio::test]
    async fn selecting_a_file_then_download() {
        let tree = Tree::default();
        let runner = runner(&tree);
        let dir = tempfile::tempdir().unwrap();
        let mut b = Browser::new(&tree, &runner, RetryPolicy::with_attempts(1), dir.path());
        b.reload().await;

        b.handle("2").await;
        assert_eq!(b.selected.as_ref().map(|e| e.name.as_str()), Some("a.txt"));
        b.handle("D").await;

        assert_eq!(tree.downloads.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"data");
    }

    #[tokio::test]
    async fn download_all_skips_folders() {
        let tree = Tree::default();
        let runner = runner(&tree);
        let dir = tempfile::tempdir().unwrap();
        let mut b = Browser::new(&tree, &runner, RetryPolicy::with_attempts(1), dir.path());
        b.reload().await;

        b.handle("SDA").await;
        assert_eq!(tree.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_and_out_of_range_commands_continue() {
        let tree = Tree::default();
        let runner = runner(&tree);
        let dir = tempfile::tempdir().unwrap();
        let mut b = Browser::new(&tree, &runner, RetryPolicy::with_attempts(1), dir.path());
        b.reload().await;

        assert_eq!(b.handle("9").await, Flow::Continue);
        assert_eq!(b.handle("zz").await, Flow::Continue);
        assert_eq!(b.handle("u").await, Flow::Continue);
        assert_eq!(b.here.name, "root");
        assert_eq!(b.handle("q").await, Flow::Quit);
    }

    #[tokio::test]
    async fn run_reads_search_query_from_next_line() {
        let tree = Tree::default();
        let runner = runner(&tree);
        let dir = tempfile::tempdir().unwrap();
        let mut b = Browser::new(&tree, &runner, RetryPolicy::with_attempts(1), dir.path());
        let mut input = BufReader::new(&b"s\nholiday\nq\n"[..]).lines();

        b.run(&mut input).await.unwrap();

        assert_eq!(b.items[0].name, "holiday.txt");
        assert_eq!(b.here.name, "search: holiday");
    }
}
