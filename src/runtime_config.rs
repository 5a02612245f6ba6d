use std::collections::HashMap;

const ENV_LOOKUP_FILES: &str = "STYLED_VARS_LOOKUP_FILES";
const ENV_IGNORE_GLOBS: &str = "STYLED_VARS_IGNORE_GLOBS";
const ENV_LANGUAGES: &str = "STYLED_VARS_LANGUAGES";
const ENV_NO_COLOR_PREVIEW: &str = "STYLED_VARS_NO_COLOR_PREVIEW";

/// Startup settings from command-line flags and environment variables.
///
/// `None` lists mean "use the built-in default".
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub enable_color_preview: bool,
    pub lookup_files: Option<Vec<String>>,
    pub ignore_globs: Option<Vec<String>>,
    pub enabled_languages: Option<Vec<String>>,
}

fn get_arg_value(args: &[String], name: &str) -> Option<String> {
    let flag = format!("--{name}");
    if let Some(idx) = args.iter().position(|arg| arg == &flag) {
        if let Some(candidate) = args.get(idx + 1) {
            if !candidate.starts_with('-') {
                return Some(candidate.to_string());
            }
        }
        return None;
    }

    let prefix = format!("{}=", flag);
    for arg in args {
        if let Some(rest) = arg.strip_prefix(&prefix) {
            return Some(rest.to_string());
        }
    }

    None
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

/// Collect a repeatable list flag.
///
/// `--<plural> a,b` and `--<plural>=a,b` take comma lists, `--<singular> a`
/// adds one entry. CLI entries win over the environment variable.
fn resolve_list(
    args: &[String],
    env: &HashMap<String, String>,
    plural: &str,
    singular: &str,
    env_key: &str,
) -> Option<Vec<String>> {
    let plural_flag = format!("--{plural}");
    let plural_prefix = format!("--{plural}=");
    let singular_flag = format!("--{singular}");
    let singular_prefix = format!("--{singular}=");

    let mut cli_values = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == &plural_flag {
            if let Some(next) = args.get(i + 1) {
                if !next.starts_with('-') {
                    cli_values.extend(split_list(next));
                    i += 1;
                }
            }
        } else if let Some(rest) = arg.strip_prefix(&plural_prefix) {
            cli_values.extend(split_list(rest));
        } else if arg == &singular_flag {
            if let Some(next) = args.get(i + 1) {
                if !next.starts_with('-') {
                    cli_values.push(next.to_string());
                    i += 1;
                }
            }
        } else if let Some(rest) = arg.strip_prefix(&singular_prefix) {
            cli_values.push(rest.to_string());
        }
        i += 1;
    }

    if !cli_values.is_empty() {
        return Some(cli_values);
    }

    if let Some(env_value) = env.get(env_key) {
        let env_values = split_list(env_value);
        if !env_values.is_empty() {
            return Some(env_values);
        }
    }

    None
}

fn resolve_languages(args: &[String], env: &HashMap<String, String>) -> Option<Vec<String>> {
    let raw = get_arg_value(args, "languages").or_else(|| env.get(ENV_LANGUAGES).cloned())?;
    let languages = split_list(&raw);
    if languages.is_empty() {
        None
    } else {
        Some(languages)
    }
}

pub fn build_runtime_config_with_env(
    args: &[String],
    env: &HashMap<String, String>,
) -> RuntimeConfig {
    let enable_color_preview = !(args.iter().any(|arg| arg == "--no-color-preview")
        || env
            .get(ENV_NO_COLOR_PREVIEW)
            .map(|v| v == "1")
            .unwrap_or(false));

    RuntimeConfig {
        enable_color_preview,
        lookup_files: resolve_list(args, env, "lookup-files", "lookup-file", ENV_LOOKUP_FILES),
        ignore_globs: resolve_list(args, env, "ignore-globs", "ignore-glob", ENV_IGNORE_GLOBS),
        enabled_languages: resolve_languages(args, env),
    }
}

pub fn build_runtime_config(args: &[String]) -> RuntimeConfig {
    let env: HashMap<String, String> = std::env::vars().collect();
    build_runtime_config_with_env(args, &env)
}
