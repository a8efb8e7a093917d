use pylon_config::PylonConfig;
use pylon_core::PylonError;
use pylon_plugin::{PluginManager, ScanReport};

/// Build a manager and run the startup scans.
pub(super) fn discover(config: PylonConfig) -> pylon_core::Result<(PluginManager, Vec<ScanReport>)> {
    let mut manager = PluginManager::new(config)?;
    let reports = manager.init()?;
    Ok((manager, reports))
}

pub(super) fn cmd_scan(config: PylonConfig, json: bool) -> pylon_core::Result<()> {
    let (manager, reports) = discover(config)?;
    let registry = manager.registry();

    if json {
        let plugins: Vec<_> = registry.plugins().collect();
        let out = serde_json::json!({
            "plugins": plugins,
            "errors": manager.scanning_errors(),
            "faults": manager.load_errors().iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for report in &reports {
        println!(
            "{} ({}): {} found, {} registered, {} rejected, {} faults",
            report.label,
            report.dir.display(),
            report.discovered,
            report.registered.len(),
            report.rejected.len(),
            report.faults
        );
    }

    if registry.is_empty() {
        println!("No plugins registered.");
        return Ok(());
    }

    println!();
    for p in registry.plugins() {
        let version = if p.info.version.is_empty() {
            "-"
        } else {
            p.info.version.as_str()
        };
        println!(
            "  {:<32} {:<10} {:<10} {:<9} {}",
            p.id,
            p.plugin_type,
            version,
            p.signature,
            if p.is_core { "core" } else { "" }
        );
    }
    Ok(())
}

pub(super) fn cmd_info(config: PylonConfig, id: &str) -> pylon_core::Result<()> {
    let (manager, _) = discover(config)?;
    let registry = manager.registry();
    let plugin = registry
        .get_plugin(id)
        .ok_or_else(|| PylonError::PluginNotFound(id.to_string()))?;
    println!("{}", serde_json::to_string_pretty(plugin)?);
    Ok(())
}

pub(super) fn cmd_routes(config: PylonConfig) -> pylon_core::Result<()> {
    let (manager, _) = discover(config)?;
    let registry = manager.registry();
    if registry.static_routes().is_empty() {
        println!("No static routes.");
    }
    for route in registry.static_routes() {
        println!(
            "  public/plugins/{:<32} -> {}",
            route.plugin_id,
            route.directory.display()
        );
    }
    Ok(())
}

pub(super) fn cmd_errors(config: PylonConfig) -> pylon_core::Result<()> {
    let (manager, _) = discover(config)?;
    let rejected = manager.scanning_errors();
    let faults = manager.load_errors();

    if rejected.is_empty() && faults.is_empty() {
        println!("No plugin errors.");
        return Ok(());
    }
    for e in &rejected {
        println!("  {:<32} {}", e.plugin_id, e.error_code);
    }
    for fault in faults {
        println!("  {fault}");
    }
    Ok(())
}
