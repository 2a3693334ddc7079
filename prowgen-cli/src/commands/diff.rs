//! `prowgen diff`: show unified diffs for what generate would write.

use anyhow::{bail, Context, Result};
use clap::Args;

use prowgen_generator::diff_output;

use super::{OutputArgs, RunArgs};

/// Arguments for `prowgen diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub run_args: RunArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let generated = self.run_args.execute()?;
        let targets = self.output.targets(&generated);
        if targets.is_empty() {
            bail!(
                "diff needs at least one of --jobs-output, --testgrid-output, \
                 --prow-config-output"
            );
        }

        let mut any = false;
        for (path, content) in targets {
            let Some(diff) = diff_output(&path, content)
                .with_context(|| format!("could not diff {}", path.display()))?
            else {
                continue;
            };
            any = true;
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        if !any {
            println!("No differences.");
        }
        Ok(())
    }
}
