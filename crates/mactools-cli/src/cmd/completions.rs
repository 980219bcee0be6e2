//! `mactools completions <shell>`

use clap::CommandFactory;
use clap_complete::{Shell, generate};

/// Write the completion script for `shell` to stdout.
pub fn completions(shell: Shell) {
    let mut cmd = crate::Cli::command();
    let bin = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin, &mut std::io::stdout().lock());
}
