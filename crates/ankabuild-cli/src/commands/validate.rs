use super::{json_pretty, CommandError, EXIT_SUCCESS};
use ankabuild_schema::{load_config, BuildConfig, NameGenerator, VmSource};
use std::path::Path;

pub fn run(template: &Path, json: bool) -> Result<u8, CommandError> {
    let config = load_config(template, &mut NameGenerator::from_time())?;

    if json {
        println!("{}", json_pretty(&config)?);
    } else {
        print!("{}", summary(&config));
    }
    Ok(EXIT_SUCCESS)
}

fn summary(config: &BuildConfig) -> String {
    let mut out = String::from("template: ok\n");
    match &config.source {
        VmSource::Installer { app } => out.push_str(&format!("source: installer {app}\n")),
        VmSource::Existing { name } => out.push_str(&format!("source: vm {name}\n")),
    }
    out.push_str(&format!(
        "vm_name: {}\n",
        config.vm_name.as_deref().unwrap_or("(generated)")
    ));
    if config.enable_htt {
        out.push_str("hyperthreading: enable\n");
    } else if config.disable_htt {
        out.push_str("hyperthreading: disable\n");
    }
    for rule in &config.port_forwarding_rules {
        let host = rule
            .host_port
            .map_or_else(|| "auto".to_owned(), |p| p.to_string());
        out.push_str(&format!(
            "port forwarding: {} guest {} -> host {host}\n",
            rule.name, rule.guest_port
        ));
    }
    out.push_str(&format!("boot_delay: {:?}\n", config.boot_delay));
    if config.stop_vm {
        out.push_str("stop_vm: true\n");
    }
    out
}
