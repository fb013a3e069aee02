use std::io::{self, BufRead, Write};
use tracing::{info, warn};
use xrdcloud::engine::sink::{OutputSpace, ResetGate};

/// Asks on the terminal before the output directories are wiped.
///
/// Enter confirms. End of input or a read error declines, so a closed stdin can never
/// delete anything.
pub struct ConsoleGate<R, W> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl ConsoleGate<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio(assume_yes: bool) -> Self {
        Self::new(io::stdin().lock(), io::stderr(), assume_yes)
    }
}

impl<R: BufRead, W: Write> ConsoleGate<R, W> {
    pub fn new(input: R, output: W, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            assume_yes,
        }
    }
}

impl<R: BufRead, W: Write> ResetGate for ConsoleGate<R, W> {
    fn confirm(&mut self, space: &OutputSpace) -> bool {
        if self.assume_yes {
            info!("Resetting output space without confirmation (--yes).");
            return true;
        }

        let shown = writeln!(
            self.output,
            "Attention, all existing training data will be deleted and regenerated:\n  {}\n  {}\n>> Hit Enter to continue, Ctrl+C to terminate..",
            space.features_dir().display(),
            space.targets_dir().display(),
        )
        .and_then(|()| self.output.flush());
        if let Err(e) = shown {
            warn!("Cannot show the reset prompt: {}", e);
            return false;
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) => {
                warn!("Cannot read the reset confirmation: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::Path;

    fn space() -> OutputSpace {
        OutputSpace::under(Path::new("data"))
    }

    #[test]
    fn enter_confirms_and_shows_both_directories() {
        let mut shown = Vec::new();
        let mut gate = ConsoleGate::new(Cursor::new("\n"), &mut shown, false);
        assert!(gate.confirm(&space()));

        let text = String::from_utf8(shown).unwrap();
        assert!(text.contains("features"));
        assert!(text.contains("target"));
        assert!(text.contains("Hit Enter"));
    }

    #[test]
    fn closed_input_declines() {
        let mut gate = ConsoleGate::new(Cursor::new(""), Vec::new(), false);
        assert!(!gate.confirm(&space()));
    }

    #[test]
    fn assume_yes_skips_the_prompt() {
        let mut shown = Vec::new();
        let mut gate = ConsoleGate::new(Cursor::new(""), &mut shown, true);
        assert!(gate.confirm(&space()));
        assert!(shown.is_empty());
    }
}
