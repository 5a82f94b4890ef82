use super::{json_pretty, CommandError, EXIT_SUCCESS};
use ankabuild_client::CliClient;
use ankabuild_core::{install_signal_handler, Builder, CancelFlag, ConsoleUi};
use ankabuild_schema::{load_config, NameGenerator};
use console::Style;
use std::path::Path;
use std::sync::Arc;

pub fn run(template: &Path, anka_bin: &Path, json: bool) -> Result<u8, CommandError> {
    let mut names = NameGenerator::from_time();
    let config = load_config(template, &mut names)?;

    let cancel = CancelFlag::new();
    install_signal_handler(cancel.clone());

    let artifact = Builder::new(
        config,
        Arc::new(CliClient::with_binary(anka_bin)),
        Arc::new(ConsoleUi::default()),
    )
    .with_names(names)
    .with_cancel_flag(cancel)
    .run()?;

    if json {
        println!("{}", json_pretty(&artifact)?);
    } else {
        println!(
            "{} VM {}",
            Style::new().green().bold().apply_to("built"),
            artifact.vm_name
        );
    }
    Ok(EXIT_SUCCESS)
}
