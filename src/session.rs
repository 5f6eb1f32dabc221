//! Interactive session flow: search, pick, confirm, download.
//!
//! The machine is terminal-free; the TUI layer feeds it [`SessionInput`]
//! values and ticks and reads its state back for rendering. Each phase owns
//! the data that only exists in that phase, including the completion channel
//! of the background work it is waiting on. Leaving a phase drops its
//! channel, so a completion signal from an abandoned operation can never
//! reach the machine in the wrong state.

use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::info;

use crate::catalog::CatalogClient;
use crate::domain::{BookFormat, Listing};
use crate::download::{DownloadJob, FileFetcher};
use crate::error::BookgrabError;
use crate::sanitize;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Discrete user input, already mapped from raw terminal events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    Char(char),
    Backspace,
    Enter,
    /// Per-state cancel (Esc): back out one phase, or exit from Start.
    Cancel,
    /// Global cancel (Ctrl+C): terminate regardless of phase.
    Quit,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Start,
    Loading,
    ListView,
    Confirmation,
    Downloading,
    Done,
}

enum Phase {
    Start,
    Loading {
        rx: Receiver<Result<Vec<Listing>, BookgrabError>>,
    },
    ListView {
        listings: Vec<Listing>,
        cursor: usize,
    },
    Confirmation {
        listings: Vec<Listing>,
        cursor: usize,
    },
    Downloading {
        job: DownloadJob,
        listings: Vec<Listing>,
        cursor: usize,
    },
    Done,
}

pub struct Session<C, F> {
    catalog: Arc<C>,
    fetcher: Arc<F>,
    save_root: PathBuf,
    phase: Phase,
    /// The single free-text field: the search term on Start, reused for the
    /// destination path on Confirmation.
    input: String,
    term: String,
    notice: Option<String>,
    tick: usize,
    quit: bool,
}

impl<C, F> Session<C, F>
where
    C: CatalogClient + 'static,
    F: FileFetcher + 'static,
{
    pub fn new(catalog: C, fetcher: F, save_root: PathBuf) -> Self {
        Self {
            catalog: Arc::new(catalog),
            fetcher: Arc::new(fetcher),
            save_root,
            phase: Phase::Start,
            input: String::new(),
            term: String::new(),
            notice: None,
            tick: 0,
            quit: false,
        }
    }

    pub fn handle(&mut self, input: SessionInput) {
        if input == SessionInput::Quit {
            // Background work is abandoned, not drained; process exit
            // reclaims everything.
            self.quit = true;
            return;
        }

        let phase = mem::replace(&mut self.phase, Phase::Start);
        self.phase = match phase {
            Phase::Start => self.handle_start(input),
            Phase::ListView { listings, cursor } => self.handle_list(input, listings, cursor),
            Phase::Confirmation { listings, cursor } => {
                self.handle_confirmation(input, listings, cursor)
            }
            // Loading, Downloading and Done only react to ticks.
            passive => passive,
        };
    }

    /// Advances the spinner and consumes at most one pending completion
    /// signal, only for the phase that expects it.
    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);

        let phase = mem::replace(&mut self.phase, Phase::Start);
        self.phase = match phase {
            Phase::Loading { rx } => match rx.try_recv() {
                Ok(Ok(listings)) => {
                    info!(results = listings.len(), term = %self.term, "search finished");
                    Phase::ListView {
                        listings,
                        cursor: 0,
                    }
                }
                Ok(Err(err)) => {
                    self.notice = Some(err.to_string());
                    Phase::Start
                }
                Err(TryRecvError::Empty) => Phase::Loading { rx },
                Err(TryRecvError::Disconnected) => {
                    self.notice =
                        Some("search failed before returning a result".to_string());
                    Phase::Start
                }
            },
            Phase::Downloading {
                job,
                listings,
                cursor,
            } => match job.try_finish() {
                Some(Ok(())) => Phase::Done,
                Some(Err(err)) => {
                    // Recoverable: back to Confirmation with the path still
                    // in the input field for retry.
                    self.notice = Some(err.to_string());
                    Phase::Confirmation { listings, cursor }
                }
                None => Phase::Downloading {
                    job,
                    listings,
                    cursor,
                },
            },
            Phase::Done => {
                self.quit = true;
                Phase::Done
            }
            other => other,
        };
    }

    fn handle_start(&mut self, input: SessionInput) -> Phase {
        match input {
            SessionInput::Enter => {
                let term = self.input.trim().to_string();
                if term.is_empty() {
                    self.notice = Some("search term cannot be empty".to_string());
                    return Phase::Start;
                }
                self.notice = None;
                self.term = term.clone();
                let catalog = Arc::clone(&self.catalog);
                let (tx, rx) = mpsc::channel();
                thread::spawn(move || {
                    let _ = tx.send(catalog.search(&term, 0));
                });
                Phase::Loading { rx }
            }
            SessionInput::Cancel => {
                self.quit = true;
                Phase::Start
            }
            SessionInput::Char(ch) => {
                self.input.push(ch);
                Phase::Start
            }
            SessionInput::Backspace => {
                self.input.pop();
                Phase::Start
            }
            _ => Phase::Start,
        }
    }

    fn handle_list(
        &mut self,
        input: SessionInput,
        listings: Vec<Listing>,
        cursor: usize,
    ) -> Phase {
        match input {
            SessionInput::Cancel => {
                self.notice = None;
                Phase::Start
            }
            SessionInput::Up => Phase::ListView {
                listings,
                cursor: cursor.saturating_sub(1),
            },
            SessionInput::Down => {
                let last = listings.len().saturating_sub(1);
                Phase::ListView {
                    listings,
                    cursor: (cursor + 1).min(last),
                }
            }
            SessionInput::Enter => {
                let Some(selected) = listings.get(cursor) else {
                    self.notice = Some("no results to select".to_string());
                    return Phase::ListView { listings, cursor };
                };
                let destination =
                    sanitize::build_destination(&self.save_root, selected, BookFormat::Epub);
                self.input = destination.to_string_lossy().into_owned();
                self.notice = None;
                Phase::Confirmation { listings, cursor }
            }
            _ => Phase::ListView { listings, cursor },
        }
    }

    fn handle_confirmation(
        &mut self,
        input: SessionInput,
        listings: Vec<Listing>,
        cursor: usize,
    ) -> Phase {
        match input {
            SessionInput::Cancel => {
                self.notice = None;
                Phase::ListView { listings, cursor }
            }
            SessionInput::Enter => {
                let path = self.input.trim();
                if path.is_empty() {
                    self.notice = Some("download path cannot be empty".to_string());
                    return Phase::Confirmation { listings, cursor };
                }
                let destination = PathBuf::from(path);
                let catalog_id = listings[cursor].catalog_id.clone();
                let catalog = Arc::clone(&self.catalog);
                let fetcher = Arc::clone(&self.fetcher);
                self.notice = None;
                // Resolve and transfer together off the event loop; the two
                // steps form the one background download unit.
                let job = DownloadJob::start(move || {
                    let url = catalog.resolve_download(&catalog_id)?;
                    fetcher.fetch(&url, &destination)
                });
                Phase::Downloading {
                    job,
                    listings,
                    cursor,
                }
            }
            SessionInput::Char(ch) => {
                self.input.push(ch);
                Phase::Confirmation { listings, cursor }
            }
            SessionInput::Backspace => {
                self.input.pop();
                Phase::Confirmation { listings, cursor }
            }
            _ => Phase::Confirmation { listings, cursor },
        }
    }

    pub fn phase(&self) -> PhaseKind {
        match self.phase {
            Phase::Start => PhaseKind::Start,
            Phase::Loading { .. } => PhaseKind::Loading,
            Phase::ListView { .. } => PhaseKind::ListView,
            Phase::Confirmation { .. } => PhaseKind::Confirmation,
            Phase::Downloading { .. } => PhaseKind::Downloading,
            Phase::Done => PhaseKind::Done,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Current result rows, empty outside the list-bearing phases.
    pub fn listings(&self) -> &[Listing] {
        match &self.phase {
            Phase::ListView { listings, .. }
            | Phase::Confirmation { listings, .. }
            | Phase::Downloading { listings, .. } => listings,
            _ => &[],
        }
    }

    pub fn cursor(&self) -> usize {
        match &self.phase {
            Phase::ListView { cursor, .. }
            | Phase::Confirmation { cursor, .. }
            | Phase::Downloading { cursor, .. } => *cursor,
            _ => 0,
        }
    }

    pub fn spinner_frame(&self) -> &'static str {
        SPINNER_FRAMES[self.tick % SPINNER_FRAMES.len()]
    }
}
