//! `prowgen generate`: render every artifact and write it.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use prowgen_generator::{write_outputs, WriteResult};

use super::{OutputArgs, RunArgs};

/// Arguments for `prowgen generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub run_args: RunArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Show what would be written without actually writing any files.
    #[arg(long)]
    pub dry_run: bool,
}

impl GenerateArgs {
    pub fn run(self) -> Result<()> {
        let generated = self.run_args.execute()?;
        tracing::info!(jobs = generated.job_count, "generated jobs");

        // Jobs go to stdout unless a file was named; the summary then moves
        // to stderr so stdout stays valid YAML.
        let jobs_on_stdout = self.output.jobs_output.is_none();
        if jobs_on_stdout {
            print!("{}", generated.jobs);
        }

        let writes = write_outputs(&self.output.targets(&generated), self.dry_run)
            .context("could not write outputs")?;
        if !writes.is_empty() {
            let summary = format_results(&writes, self.dry_run);
            if jobs_on_stdout {
                eprint!("{summary}");
            } else {
                print!("{summary}");
            }
        }
        Ok(())
    }
}

fn format_results(writes: &[WriteResult], dry_run: bool) -> String {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let written = writes
        .iter()
        .filter(|r| matches!(r, WriteResult::Written { .. } | WriteResult::WouldWrite { .. }))
        .count();
    let unchanged = writes.len() - written;

    let mut out = format!(
        "{prefix}{} generated ({written} written, {unchanged} unchanged)\n",
        "✓".green().bold()
    );
    for r in writes {
        let marker = match r {
            WriteResult::Written { .. } => "✎",
            WriteResult::WouldWrite { .. } => "~",
            WriteResult::Unchanged { .. } => "·",
        };
        out.push_str(&format!("  {marker}  {}\n", r.path().display()));
    }
    out
}
