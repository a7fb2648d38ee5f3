use std::{
    io::{Stdout, Write},
    time::Duration,
};

use color_eyre::eyre::Result;
use crossterm::{
    cursor,
    event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind},
    queue,
    style::Print,
    terminal::{self, Clear, ClearType},
};
use flume::{Receiver, Sender};
use futures::{FutureExt, StreamExt};
use tokio::task::JoinHandle;

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Clone, Debug)]
pub enum TerminalEvent {
    Init,
    Closed,
    Tick,
    Key(KeyEvent),
    Resize(u16, u16),
}

/// Raw-mode terminal with a single redrawn status line.
pub struct Tui {
    pub event_rx: Receiver<TerminalEvent>,
    pub event_tx: Sender<TerminalEvent>,
    stdout: Stdout,
    task: Option<JoinHandle<()>>,
}

impl Tui {
    pub fn new() -> Result<Self> {
        let (event_tx, event_rx) = flume::unbounded();

        Ok(Self {
            event_rx,
            event_tx,
            stdout: std::io::stdout(),
            task: None,
        })
    }

    pub fn start(&mut self) {
        let event_tx = self.event_tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut reader = EventStream::new();
            let mut tick_interval = tokio::time::interval(TICK_RATE);
            loop {
                let tick_delay = tick_interval.tick();
                let crossterm_event = reader.next().fuse();

                tokio::select! {
                    _ = tick_delay => {
                        let _ = event_tx.send_async(TerminalEvent::Tick).await;
                    }
                    maybe_event = crossterm_event => {
                        match maybe_event {
                            Some(Ok(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                                let _ = event_tx.send_async(TerminalEvent::Key(key)).await;
                            }
                            Some(Ok(CrosstermEvent::Resize(x, y))) => {
                                let _ = event_tx.send_async(TerminalEvent::Resize(x, y)).await;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(_)) | None => {
                                let _ = event_tx.send_async(TerminalEvent::Closed).await;
                                break;
                            }
                        }
                    }
                }
            }
        }));
    }

    pub fn enter(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        crossterm::execute!(self.stdout, cursor::Hide)?;
        self.start();
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if terminal::is_raw_mode_enabled()? {
            crossterm::execute!(self.stdout, Print("\r\n"))?;
            Self::restore()?;
        }
        Ok(())
    }

    pub fn restore() -> Result<()> {
        crossterm::execute!(std::io::stdout(), cursor::Show)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    /// Replaces the current line with `status`, cut to the terminal width.
    pub fn draw_status(&mut self, status: &str) -> Result<()> {
        let width = terminal::size().map(|(w, _)| w as usize).unwrap_or(80);
        let line: String = status.chars().take(width.saturating_sub(1)).collect();
        queue!(
            self.stdout,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )?;
        self.stdout.flush()?;
        Ok(())
    }

    #[allow(clippy::should_implement_trait)]
    pub async fn next(&self) -> Option<TerminalEvent> {
        self.event_rx.recv_async().await.ok()
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.exit();
    }
}
