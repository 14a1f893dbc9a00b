/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub hint: HintConfig,
    pub gamepad: GamepadConfig,
    /// Custom level catalog. May not exist; the built-in catalog is used then.
    pub levels_file: PathBuf,
}

#[derive(Clone, Debug)]
pub struct HintConfig {
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key. Unset or empty = offline hints.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
    pub temperature: f64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub add: Vec<String>,
    pub remove: Vec<String>,
    pub run: Vec<String>,
    pub reset: Vec<String>,
    pub hint: Vec<String>,
    pub next: Vec<String>,
    pub switch: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    hint: TomlHint,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlHint {
    #[serde(default = "default_endpoint")]
    endpoint: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_api_key_env")]
    api_key_env: String,
    #[serde(default = "default_timeout")]
    timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    temperature: f64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_add")]
    add: Vec<String>,
    #[serde(default = "default_remove")]
    remove: Vec<String>,
    #[serde(default = "default_run")]
    run: Vec<String>,
    #[serde(default = "default_reset")]
    reset: Vec<String>,
    #[serde(default = "default_hint")]
    hint: Vec<String>,
    #[serde(default = "default_next")]
    next: Vec<String>,
    #[serde(default = "default_switch")]
    switch: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_file")]
    levels_file: String,
}

// ── Defaults ──

fn default_endpoint() -> String { "https://generativelanguage.googleapis.com/v1beta/models".into() }
fn default_model() -> String { "gemini-3-flash-preview".into() }
fn default_api_key_env() -> String { "API_KEY".into() }
fn default_timeout() -> u64 { 15 }
fn default_max_tokens() -> u32 { 150 }
fn default_temperature() -> f64 { 0.7 }

fn default_add() -> Vec<String> { vec!["A".into()] }
fn default_remove() -> Vec<String> { vec!["B".into()] }
fn default_run() -> Vec<String> { vec!["Start".into()] }
fn default_reset() -> Vec<String> { vec!["Select".into()] }
fn default_hint() -> Vec<String> { vec!["Y".into()] }
fn default_next() -> Vec<String> { vec!["X".into()] }
fn default_switch() -> Vec<String> { vec!["L1".into(), "R1".into()] }
fn default_levels_file() -> String { "levels.toml".into() }

impl Default for TomlHint {
    fn default() -> Self {
        TomlHint {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout(),
            max_output_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            add: default_add(),
            remove: default_remove(),
            run: default_run(),
            reset: default_reset(),
            hint: default_hint(),
            next: default_next(),
            switch: default_switch(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_file: default_levels_file(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        resolve(toml_cfg, &search_dirs)
    }

    /// The API key for the hint service, if the configured variable is set.
    pub fn hint_api_key(&self) -> Option<String> {
        std::env::var(&self.hint.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> GameConfig {
    // Resolve levels file: first existing candidate wins
    let levels_str = &toml_cfg.general.levels_file;
    let levels_file = if Path::new(levels_str).is_absolute() {
        PathBuf::from(levels_str)
    } else {
        search_dirs.iter()
            .map(|d| d.join(levels_str))
            .find(|p| p.is_file())
            .unwrap_or_else(|| PathBuf::from(levels_str))
    };

    GameConfig {
        hint: HintConfig {
            endpoint: toml_cfg.hint.endpoint,
            model: toml_cfg.hint.model,
            api_key_env: toml_cfg.hint.api_key_env,
            timeout_secs: toml_cfg.hint.timeout_secs,
            max_output_tokens: toml_cfg.hint.max_output_tokens,
            temperature: toml_cfg.hint.temperature,
        },
        gamepad: GamepadConfig {
            add: toml_cfg.gamepad.add,
            remove: toml_cfg.gamepad.remove,
            run: toml_cfg.gamepad.run,
            reset: toml_cfg.gamepad.reset,
            hint: toml_cfg.gamepad.hint,
            next: toml_cfg.gamepad.next,
            switch: toml_cfg.gamepad.switch,
        },
        levels_file,
    }
}

/// Candidate directories to search: exe dir + CWD + data dirs (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable (symlinks resolved)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/codequest)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/codequest");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/codequest");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
