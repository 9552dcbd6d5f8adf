//! Keyboard shortcuts of watch mode: `r` rebuilds, `q` quits.

use knit_bundler::WatchHandle;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shortcut {
    Restart,
    Quit,
}

fn parse(line: &str) -> Option<Shortcut> {
    match line.trim() {
        "r" | "rs" => Some(Shortcut::Restart),
        "q" => Some(Shortcut::Quit),
        _ => None,
    }
}

/// Read shortcuts from stdin until `handle` stops. Nothing is spawned when
/// nobody is at the terminal.
pub fn spawn(handle: WatchHandle) -> Option<JoinHandle<()>> {
    if !ui::is_interactive() {
        return None;
    }
    ui::hint("press r + enter to rebuild, q + enter to quit");

    Some(tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                _ = handle.stopped() => return,
                line = lines.next_line() => line,
            };
            match line {
                Ok(Some(line)) => match parse(&line) {
                    Some(Shortcut::Restart) => {
                        if handle.restart() {
                            ui::info("Restarting...");
                        }
                    }
                    Some(Shortcut::Quit) => {
                        handle.quit();
                        return;
                    }
                    None => {}
                },
                Ok(None) => return,
                Err(e) => {
                    tracing::debug!("Stopped reading shortcuts: {e}");
                    return;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shortcuts() {
        assert_eq!(parse("r\n"), Some(Shortcut::Restart));
        assert_eq!(parse(" rs "), Some(Shortcut::Restart));
        assert_eq!(parse("q"), Some(Shortcut::Quit));
        assert_eq!(parse("x"), None);
        assert_eq!(parse(""), None);
    }
}
