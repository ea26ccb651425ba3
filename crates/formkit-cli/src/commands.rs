use anyhow::{Context, Result};
use tokio::runtime::Builder;
use tokio::task::LocalSet;

use formkit_cli::pipeline::{ValidateInput, ValidationReport, validate};
use formkit_rules::RuleLibrary;

use crate::cli::ValidateArgs;
use crate::summary::print_rules;

pub fn run_rules() -> Result<()> {
    let library = RuleLibrary::builtin();
    print_rules(library.names());
    Ok(())
}

pub fn run_validate(args: &ValidateArgs) -> Result<ValidationReport> {
    let input = ValidateInput::load(
        &args.schema,
        args.values.as_deref(),
        args.config.as_deref(),
    )?;
    let runtime = Builder::new_current_thread()
        .enable_time()
        .build()
        .context("start runtime")?;
    LocalSet::new().block_on(&runtime, validate(input))
}

pub fn print_json(report: &ValidationReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    println!("{json}");
    Ok(())
}
