use super::{json_pretty, CommandError, Progress, EXIT_SUCCESS};
use ankabuild_client::{
    AnkaClient, CliClient, RegistryEntry, RegistryPushParams, RegistryRestClient,
};
use ankabuild_schema::RegistryConfig;
use console::Style;
use std::path::Path;

pub fn list(
    registry: &RegistryConfig,
    anka_bin: &Path,
    rest: bool,
    json: bool,
) -> Result<u8, CommandError> {
    let progress = Progress::start(json, "listing registry templates...");
    let result = if rest {
        RegistryRestClient::new(registry).and_then(|client| client.list())
    } else {
        CliClient::with_binary(anka_bin).registry_list(registry)
    };
    let entries = progress.finish(result, "registry list")?;

    if json {
        println!("{}", json_pretty(&entries)?);
    } else {
        print!("{}", render_entries(&entries));
    }
    Ok(EXIT_SUCCESS)
}

pub fn push(
    registry: &RegistryConfig,
    anka_bin: &Path,
    params: &RegistryPushParams,
    json: bool,
) -> Result<u8, CommandError> {
    let progress = Progress::start(json, &format!("pushing {}...", params.vm_id));
    let result = CliClient::with_binary(anka_bin).registry_push(registry, params);
    progress.finish(result, "push")?;

    if json {
        let payload = serde_json::json!({
            "vm": params.vm_id,
            "tag": params.tag,
            "status": "pushed",
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("pushed {}", params.vm_id);
        if let Some(tag) = &params.tag {
            println!("tagged as '{tag}'");
        }
    }
    Ok(EXIT_SUCCESS)
}

pub fn revert(registry: &RegistryConfig, id: &str, json: bool) -> Result<u8, CommandError> {
    let client = RegistryRestClient::new(registry)?;
    let progress = Progress::start(json, &format!("reverting {id}..."));
    progress.finish(client.revert(id), "revert")?;

    if json {
        let payload = serde_json::json!({
            "id": id,
            "registry": client.url(),
            "status": "reverted",
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("reverted latest version of {id} on {}", client.url());
    }
    Ok(EXIT_SUCCESS)
}

fn render_entries(entries: &[RegistryEntry]) -> String {
    if entries.is_empty() {
        return "no templates in registry\n".to_owned();
    }
    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0).max(4);
    let bold = Style::new().bold();
    let mut out = format!(
        "{}  {}  {}\n",
        bold.apply_to(format!("{:<width$}", "NAME")),
        bold.apply_to(format!("{:<36}", "ID")),
        bold.apply_to("LATEST")
    );
    for e in entries {
        out.push_str(&format!("{:<width$}  {:<36}  {}\n", e.name, e.id, e.latest));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_empty_registry() {
        assert_eq!(render_entries(&[]), "no templates in registry\n");
    }

    #[test]
    fn render_lists_every_entry() {
        let text = render_entries(&[
            RegistryEntry {
                latest: "v3".to_owned(),
                id: "c0847bc9-5d2d-4dbc-ba6a-240f7ff08032".to_owned(),
                name: "macos-sonoma".to_owned(),
            },
            RegistryEntry {
                latest: "v1".to_owned(),
                id: "8f1c2e7a-0b1d-4b8e-9f4d-2a6c5e3b9d10".to_owned(),
                name: "xcode".to_owned(),
            },
        ]);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("macos-sonoma"));
        assert!(lines[1].ends_with("v3"));
        assert!(lines[2].contains("8f1c2e7a-0b1d-4b8e-9f4d-2a6c5e3b9d10"));
    }

    #[test]
    fn revert_requires_registry_url() {
        let err = revert(&RegistryConfig::default(), "abc", true).unwrap_err();
        assert!(err.message.starts_with("registry config error:"));
        assert_eq!(err.code, crate::commands::EXIT_CONFIG_ERROR);
    }
}
