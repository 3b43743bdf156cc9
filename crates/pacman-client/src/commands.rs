//! Commands-file grammar (§6), including the reference client's
//! rewind-and-replay-on-EOF behavior (expansion, see `SPEC_FULL.md` §6).

use std::fs;
use std::io;
use std::path::Path;

/// One parsed line from a commands file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAction {
    /// Send a PLAY frame with this command character.
    Play(char),
    /// Send a DISCONNECT frame.
    Disconnect,
    /// Sleep this many tempos without sending anything (`T [n]`).
    Wait(u32),
}

/// A parsed commands file, replayed from the top forever once exhausted.
///
/// The reference client re-reads the file via `lseek(fd, 0, SEEK_SET)`; this
/// parses the file once up front and loops over the parsed actions, which is
/// behaviorally identical for a file that does not change mid-session.
pub struct CommandScript {
    actions: Vec<ClientAction>,
    cursor: usize,
}

impl CommandScript {
    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let actions = parse(&contents);
        Ok(Self { actions, cursor: 0 })
    }

    /// Next action, wrapping back to the start of the file on exhaustion.
    /// `None` only for an empty script.
    pub fn next(&mut self) -> Option<ClientAction> {
        if self.actions.is_empty() {
            return None;
        }
        let action = self.actions[self.cursor];
        self.cursor = (self.cursor + 1) % self.actions.len();
        Some(action)
    }
}

fn parse(contents: &str) -> Vec<ClientAction> {
    let mut actions = Vec::new();
    for line in contents.lines() {
        let line = line.trim_end_matches('\r').trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(word) = tokens.next() else { continue };
        let upper_first = word.chars().next().unwrap().to_ascii_uppercase();
        match upper_first {
            'P' if word.eq_ignore_ascii_case("PASSO") => continue,
            'P' if word.eq_ignore_ascii_case("POS") => continue,
            'T' if word.eq_ignore_ascii_case("T") => {
                let n = tokens.next().and_then(|s| s.parse::<u32>().ok()).unwrap_or(1);
                actions.push(ClientAction::Wait(n.max(1)));
            }
            other => actions.push(ClientAction::Play(other)),
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn script_from(contents: &str) -> CommandScript {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        CommandScript::load(file.path()).unwrap()
    }

    #[test]
    fn blank_and_comment_lines_are_ignored() {
        let mut script = script_from("\n# a comment\nD\n");
        assert_eq!(script.next(), Some(ClientAction::Play('D')));
    }

    #[test]
    fn passo_and_pos_lines_are_silently_skipped() {
        let mut script = script_from("PASSO 2\nPOS 1 1\nW\n");
        assert_eq!(script.next(), Some(ClientAction::Play('W')));
    }

    #[test]
    fn t_with_explicit_count_repeats_that_many_waits() {
        let mut script = script_from("T 3\nD\n");
        assert_eq!(script.next(), Some(ClientAction::Wait(3)));
        assert_eq!(script.next(), Some(ClientAction::Play('D')));
    }

    #[test]
    fn t_without_a_count_defaults_to_one() {
        let mut script = script_from("T\n");
        assert_eq!(script.next(), Some(ClientAction::Wait(1)));
    }

    #[test]
    fn script_rewinds_and_replays_after_the_last_line() {
        let mut script = script_from("A\nD\n");
        assert_eq!(script.next(), Some(ClientAction::Play('A')));
        assert_eq!(script.next(), Some(ClientAction::Play('D')));
        assert_eq!(script.next(), Some(ClientAction::Play('A')));
    }

    #[test]
    fn lowercase_commands_are_uppercased() {
        let mut script = script_from("w\n");
        assert_eq!(script.next(), Some(ClientAction::Play('W')));
    }
}
