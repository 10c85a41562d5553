//! Schema checks that serde cannot express.
//!
//! Every failure names the offending field by its dotted path, for example
//! `tasks.ios.build.resolver.alias[0].from`.

use crate::build::BuildSettings;
use crate::config::ProjectConfig;
use crate::error::ConfigValidationError;

type Result = std::result::Result<(), ConfigValidationError>;

/// Validate a whole project, including every task's build overrides.
pub fn validate_project(config: &ProjectConfig) -> Result {
    not_blank("app_name", &config.app_name)?;
    not_blank("scheme", &config.scheme)?;
    not_blank("host", &config.dev_server.host).map_err(|err| ConfigValidationError::new("dev_server.host", err.message))?;

    if config.entry_file.as_os_str().is_empty() {
        return Err(ConfigValidationError::new("entry_file", "cannot be empty"));
    }
    if config.outdir.as_os_str().is_empty() {
        return Err(ConfigValidationError::new("outdir", "cannot be empty"));
    }

    validate_settings(&config.build, "build")?;

    for (name, task) in &config.tasks {
        if name.trim().is_empty() {
            return Err(ConfigValidationError::new("tasks", "task names cannot be empty"));
        }
        if let Some(outfile) = &task.outfile {
            if outfile.as_os_str().is_empty() {
                return Err(ConfigValidationError::new(
                    format!("tasks.{}.outfile", name),
                    "cannot be empty",
                ));
            }
        }
        validate_settings(&task.build, &format!("tasks.{}.build", name))?;
    }

    Ok(())
}

/// Validate a build settings fragment. `prefix` is the fragment's own path.
pub fn validate_settings(settings: &BuildSettings, prefix: &str) -> Result {
    if let Some(resolver) = &settings.resolver {
        for (index, alias) in resolver.alias.iter().enumerate() {
            let at = format!("{}.resolver.alias[{}]", prefix, index);
            not_blank(&format!("{}.from", at), &alias.from)?;
            not_blank(&format!("{}.to", at), &alias.to)?;
        }

        for (name, handler) in &resolver.protocols {
            let at = format!("{}.resolver.protocols.{}", prefix, name);
            if name.trim().is_empty() || name.contains(':') {
                return Err(ConfigValidationError::new(
                    at,
                    "protocol names must be non-empty and must not contain `:`",
                ));
            }
            if handler.resolve.is_none() && handler.load.is_none() {
                return Err(ConfigValidationError::new(
                    at,
                    "a protocol needs a `resolve` or a `load` handler",
                ));
            }
        }
    }

    if let Some(transform) = &settings.transform {
        for (index, preset) in transform.presets.iter().enumerate() {
            not_blank(&format!("{}.transform.presets[{}]", prefix, index), preset)?;
        }
        for (index, plugin) in transform.plugins.iter().enumerate() {
            not_blank(&format!("{}.transform.plugins[{}]", prefix, index), plugin.name())?;
        }
    }

    Ok(())
}

fn not_blank(field: &str, value: &str) -> Result {
    if value.trim().is_empty() {
        return Err(ConfigValidationError::new(field, "cannot be empty"));
    }
    Ok(())
}
