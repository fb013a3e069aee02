use super::GlobalOptions;
use crate::cli::OutputArgs;
use crate::config::{Overrides, build_config};
use crate::error::Result;
use crate::utils::prompt::ConsoleGate;
use xrdcloud::engine::sink::OutputSpace;

pub fn run(args: OutputArgs, global: &GlobalOptions) -> Result<()> {
    let config = build_config(&Overrides {
        output_root: args.output,
        ..global.overrides()
    })?;

    let space = OutputSpace::under(&config.output_root);
    space.reset(&mut ConsoleGate::stdio(global.yes))?;
    println!(
        "Reset {} and {}.",
        space.features_dir().display(),
        space.targets_dir().display()
    );
    Ok(())
}
