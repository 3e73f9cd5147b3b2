use anyhow::Context;

/// Asks the user to confirm an overwrite.
///
/// NOTE: the shell asks *after* the transfer already ran, a negative answer only suppresses
/// the success message and the backup, it cannot undo the overwrite it asks about. Callers
/// relying on this to protect data should not.
pub struct OverwriteGate<'a> {
    input: &'a mut dyn std::io::BufRead,
    output: &'a mut dyn std::io::Write,
}

impl<'a> OverwriteGate<'a> {
    pub fn new(input: &'a mut dyn std::io::BufRead, output: &'a mut dyn std::io::Write) -> Self {
        Self { input, output }
    }

    /// Returns `true` only for an answer starting with `y` or `Y`, end of input declines.
    /// Blank lines are skipped, the first non-blank line is the answer.
    pub fn confirm(&mut self, destination: &std::path::Path) -> anyhow::Result<bool> {
        write!(
            self.output,
            "Do you want to overwrite {}? (y/n): ",
            destination.display()
        )
        .context("failed writing prompt")?;
        self.output.flush().context("failed writing prompt")?;
        let mut answer = String::new();
        while answer.trim().is_empty() {
            answer.clear();
            let read = self
                .input
                .read_line(&mut answer)
                .context("failed reading answer")?;
            if read == 0 {
                // keep the next output on its own line
                writeln!(self.output).context("failed writing prompt")?;
                return Ok(false);
            }
        }
        let confirmed = matches!(answer.trim_start().chars().next(), Some('y' | 'Y'));
        tracing::debug!("overwrite of {:?} confirmed: {}", destination, confirmed);
        Ok(confirmed)
    }
}
