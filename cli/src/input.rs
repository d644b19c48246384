//! Line-oriented stdin pump.
//!
//! Stdin is read on a dedicated thread so the tick loop never blocks on it.
//! Lines are queued and drained non-blockingly once per frame.

use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc;

const MAX_LINES_PER_FRAME: usize = 16; // never starve the tick

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Resend,
    /// Anything else is treated as a code attempt.
    Code(String),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => None,
            "q" | "quit" => Some(Command::Quit),
            "r" | "resend" => Some(Command::Resend),
            other => Some(Command::Code(other.to_string())),
        }
    }
}

pub struct LinePump {
    rx: mpsc::UnboundedReceiver<String>,
    closed: bool,
}

impl LinePump {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        // Detached: a blocked read must not hold up process exit.
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { rx, closed: false }
    }

    /// Stdin reached EOF and every queued line has been drained.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Commands typed since the last frame.
    pub fn drain(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        for _ in 0..MAX_LINES_PER_FRAME {
            match self.rx.try_recv() {
                Ok(line) => commands.extend(Command::parse(&line)),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        commands
    }

    /// Wait for the next non-empty line.
    pub async fn next_line(&mut self) -> Option<String> {
        while let Some(line) = self.rx.recv().await {
            let line = line.trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
        self.closed = true;
        None
    }
}

impl Drop for LinePump {
    fn drop(&mut self) {
        // The reader thread exits on its next send.
        self.rx.close();
    }
}
