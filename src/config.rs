use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;

use crate::remote::rest::parse_collection_url;

const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_FILE_NAME: &str = "phonebook.log";
const APP_NAME: &str = "phonebook";

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3001/persons";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_NOTICE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct Config {
    /// File the configuration was read from; `None` when running on defaults
    pub config_path: Option<PathBuf>,
    pub server_url: String,
    pub request_timeout: Duration,
    pub notice_timeout: Duration,
    pub log: LogConfig,
    pub keys: Keys,
    pub ui: UiConfig,
}

impl Config {
    /// Replace the server URL (command line takes precedence over the file).
    pub fn override_server_url(&mut self, url: &str) -> Result<()> {
        parse_collection_url(url)?;
        self.server_url = url.trim().to_string();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub file: PathBuf,
    pub level: String,
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
    /// Ask before deleting a contact
    pub confirm_delete: bool,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub label: RgbColor,
    pub info_fg: RgbColor,
    pub error_fg: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone)]
pub struct Keys {
    /// Keys that work in every context
    pub global: GlobalKeys,
    /// Keys for the contact list
    pub list: ListKeys,
    /// Keys for the add-contact form
    pub form: FormKeys,
    /// Keys for the filter input
    pub filter: FilterKeys,
    /// Keys for modal dialogs
    pub modal: ModalKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub next_focus: Vec<String>,
    pub prev_focus: Vec<String>,
    pub refresh: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ListKeys {
    pub quit: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub delete: Vec<String>,
    pub filter: Vec<String>,
    pub add: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FormKeys {
    pub submit: Vec<String>,
    pub cancel: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FilterKeys {
    pub confirm: Vec<String>,
    pub clear: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ModalKeys {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

// =============================================================================
// Default implementations
// =============================================================================

impl Default for Keys {
    fn default() -> Self {
        Self {
            global: GlobalKeys::default(),
            list: ListKeys::default(),
            form: FormKeys::default(),
            filter: FilterKeys::default(),
            modal: ModalKeys::default(),
        }
    }
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            next_focus: vec!["Tab".into()],
            prev_focus: vec!["Backtab".into()],
            refresh: vec!["F5".into()],
        }
    }
}

impl Default for ListKeys {
    fn default() -> Self {
        Self {
            quit: vec!["q".into()],
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
            delete: vec!["x".into(), "Delete".into()],
            filter: vec!["/".into()],
            add: vec!["a".into()],
        }
    }
}

impl Default for FormKeys {
    fn default() -> Self {
        Self {
            submit: vec!["Enter".into()],
            cancel: vec!["Escape".into()],
        }
    }
}

impl Default for FilterKeys {
    fn default() -> Self {
        Self {
            confirm: vec!["Enter".into()],
            clear: vec!["Escape".into()],
        }
    }
}

impl Default for ModalKeys {
    fn default() -> Self {
        Self {
            confirm: vec!["Enter".into(), "y".into()],
            cancel: vec!["Escape".into(), "n".into()],
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

impl Default for KeyBinding {
    fn default() -> Self {
        KeyBinding::Multiple(vec![])
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    list: ListKeysFile,
    form: FormKeysFile,
    filter: FilterKeysFile,
    modal: ModalKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    next_focus: KeyBinding,
    prev_focus: KeyBinding,
    refresh: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            next_focus: KeyBinding::Multiple(defaults.next_focus),
            prev_focus: KeyBinding::Multiple(defaults.prev_focus),
            refresh: KeyBinding::Multiple(defaults.refresh),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ListKeysFile {
    quit: KeyBinding,
    next: KeyBinding,
    prev: KeyBinding,
    delete: KeyBinding,
    filter: KeyBinding,
    add: KeyBinding,
}

impl Default for ListKeysFile {
    fn default() -> Self {
        let defaults = ListKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            delete: KeyBinding::Multiple(defaults.delete),
            filter: KeyBinding::Multiple(defaults.filter),
            add: KeyBinding::Multiple(defaults.add),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FormKeysFile {
    submit: KeyBinding,
    cancel: KeyBinding,
}

impl Default for FormKeysFile {
    fn default() -> Self {
        let defaults = FormKeys::default();
        Self {
            submit: KeyBinding::Multiple(defaults.submit),
            cancel: KeyBinding::Multiple(defaults.cancel),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FilterKeysFile {
    confirm: KeyBinding,
    clear: KeyBinding,
}

impl Default for FilterKeysFile {
    fn default() -> Self {
        let defaults = FilterKeys::default();
        Self {
            confirm: KeyBinding::Multiple(defaults.confirm),
            clear: KeyBinding::Multiple(defaults.clear),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ModalKeysFile {
    confirm: KeyBinding,
    cancel: KeyBinding,
}

impl Default for ModalKeysFile {
    fn default() -> Self {
        let defaults = ModalKeys::default();
        Self {
            confirm: KeyBinding::Multiple(defaults.confirm),
            cancel: KeyBinding::Multiple(defaults.cancel),
        }
    }
}

// =============================================================================
// Conversion from file types to runtime types
// =============================================================================

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: GlobalKeys {
                next_focus: file.global.next_focus.into_vec(),
                prev_focus: file.global.prev_focus.into_vec(),
                refresh: file.global.refresh.into_vec(),
            },
            list: ListKeys {
                quit: file.list.quit.into_vec(),
                next: file.list.next.into_vec(),
                prev: file.list.prev.into_vec(),
                delete: file.list.delete.into_vec(),
                filter: file.list.filter.into_vec(),
                add: file.list.add.into_vec(),
            },
            form: FormKeys {
                submit: file.form.submit.into_vec(),
                cancel: file.form.cancel.into_vec(),
            },
            filter: FilterKeys {
                confirm: file.filter.confirm.into_vec(),
                clear: file.filter.clear.into_vec(),
            },
            modal: ModalKeys {
                confirm: file.modal.confirm.into_vec(),
                cancel: file.modal.cancel.into_vec(),
            },
        }
    }
}

// =============================================================================
// Key binding validation
// =============================================================================

/// Normalize a key binding string to a canonical form for collision detection.
/// Single characters preserve case (since 'X' means Shift+x, different from 'x').
/// Multi-character key names are case-insensitive (Enter, ENTER, enter are the same).
fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.chars().count() == 1 {
        trimmed.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Check for collisions within a single context
fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

/// Validate all key bindings; global keys are active in every context so they
/// are checked together with each one.
fn validate_key_bindings(keys: &Keys) -> Result<()> {
    let global: [(&str, &[String]); 3] = [
        ("next_focus", &keys.global.next_focus),
        ("prev_focus", &keys.global.prev_focus),
        ("refresh", &keys.global.refresh),
    ];

    check_context_collisions(&global, "global")?;

    check_context_collisions(
        &with_global(
            &global,
            &[
                ("quit", &keys.list.quit),
                ("next", &keys.list.next),
                ("prev", &keys.list.prev),
                ("delete", &keys.list.delete),
                ("filter", &keys.list.filter),
                ("add", &keys.list.add),
            ],
        ),
        "list",
    )?;

    check_context_collisions(
        &with_global(&global, &[("submit", &keys.form.submit), ("cancel", &keys.form.cancel)]),
        "form",
    )?;

    check_context_collisions(
        &with_global(&global, &[("confirm", &keys.filter.confirm), ("clear", &keys.filter.clear)]),
        "filter",
    )?;

    check_context_collisions(
        &[("confirm", &keys.modal.confirm), ("cancel", &keys.modal.cancel)],
        "modal",
    )?;

    Ok(())
}

fn with_global<'a>(
    global: &[(&'a str, &'a [String])],
    context: &[(&'a str, &'a [String])],
) -> Vec<(&'a str, &'a [String])> {
    global.iter().chain(context.iter()).copied().collect()
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConfigFile {
    server_url: String,
    request_timeout_ms: u64,
    notice_timeout_ms: u64,
    log_file: Option<PathBuf>,
    log_level: String,
    keys: KeysFile,
    ui: UiFile,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            notice_timeout_ms: DEFAULT_NOTICE_TIMEOUT_MS,
            log_file: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            keys: KeysFile::default(),
            ui: UiFile::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
    confirm_delete: bool,
}

impl Default for UiFile {
    fn default() -> Self {
        Self {
            colors: UiColorsFile::default(),
            confirm_delete: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    label: RgbColor,
    info_fg: RgbColor,
    error_fg: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(255, 165, 0),
            selection_bg: RgbColor::new(255, 165, 0),
            selection_fg: RgbColor::new(0, 0, 0),
            label: RgbColor::new(255, 165, 0),
            info_fg: RgbColor::new(0, 200, 0),
            error_fg: RgbColor::new(230, 40, 40),
            status_fg: RgbColor::new(255, 165, 0),
            status_bg: RgbColor::new(0, 0, 0),
        }
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        Self {
            colors: UiColors {
                border: file.colors.border,
                selection_bg: file.colors.selection_bg,
                selection_fg: file.colors.selection_fg,
                label: file.colors.label,
                info_fg: file.colors.info_fg,
                error_fg: file.colors.error_fg,
                status_fg: file.colors.status_fg,
                status_bg: file.colors.status_bg,
            },
            confirm_delete: file.confirm_delete,
        }
    }
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

fn default_log_file() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.data_local_dir().join(APP_NAME).join(LOG_FILE_NAME))
}

/// Load configuration from `explicit`, or from the default location.
///
/// An explicit path must exist; a missing default file means defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let path = config_path()?;
            if !path.exists() {
                return build(ConfigFile::default(), None);
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    parse(&raw, path)
}

/// Defaults without touching the user's config or data directories.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    parse(r#"log_file = "phonebook-test.log""#, PathBuf::from("test.toml"))
        .expect("default configuration is valid")
}

fn parse(raw: &str, path: PathBuf) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw)
        .with_context(|| format!("failed to parse {} as TOML", path.display()))?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .with_context(|| format!("failed to deserialize config from {}", path.display()))?;

    build(cfg_file, Some(path))
}

fn build(cfg_file: ConfigFile, path: Option<PathBuf>) -> Result<Config> {
    parse_collection_url(&cfg_file.server_url).context("invalid `server_url`")?;

    if cfg_file.notice_timeout_ms == 0 {
        bail!("`notice_timeout_ms` must be greater than zero");
    }
    if cfg_file.request_timeout_ms == 0 {
        bail!("`request_timeout_ms` must be greater than zero");
    }

    let log_level = cfg_file.log_level.trim().to_ascii_lowercase();
    if log_level.is_empty() {
        bail!("`log_level` must not be empty");
    }

    let log_file = match cfg_file.log_file {
        Some(file) => expand_tilde(&file),
        None => default_log_file()?,
    };

    let keys: Keys = cfg_file.keys.into();
    validate_key_bindings(&keys)?;

    Ok(Config {
        config_path: path,
        server_url: cfg_file.server_url.trim().to_string(),
        request_timeout: Duration::from_millis(cfg_file.request_timeout_ms),
        notice_timeout: Duration::from_millis(cfg_file.notice_timeout_ms),
        log: LogConfig {
            file: log_file,
            level: log_level,
        },
        keys,
        ui: cfg_file.ui.into(),
    })
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    warn_unknown_in_table(
        table,
        "",
        &[
            "server_url",
            "request_timeout_ms",
            "notice_timeout_ms",
            "log_file",
            "log_level",
            "keys",
            "ui",
        ],
    );

    if let Some(keys) = table.get("keys").and_then(|v| v.as_table()) {
        warn_unknown_in_table(keys, "keys.", &["global", "list", "form", "filter", "modal"]);
        let contexts: [(&str, &[&str]); 5] = [
            ("global", &["next_focus", "prev_focus", "refresh"]),
            ("list", &["quit", "next", "prev", "delete", "filter", "add"]),
            ("form", &["submit", "cancel"]),
            ("filter", &["confirm", "clear"]),
            ("modal", &["confirm", "cancel"]),
        ];
        for (context, known) in contexts {
            if let Some(section) = keys.get(context).and_then(|v| v.as_table()) {
                warn_unknown_in_table(section, &format!("keys.{}.", context), known);
            }
        }
    }

    if let Some(ui) = table.get("ui").and_then(|v| v.as_table()) {
        warn_unknown_in_table(ui, "ui.", &["colors", "confirm_delete"]);
        if let Some(colors) = ui.get("colors").and_then(|v| v.as_table()) {
            warn_unknown_in_table(
                colors,
                "ui.colors.",
                &[
                    "border",
                    "selection_bg",
                    "selection_fg",
                    "label",
                    "info_fg",
                    "error_fg",
                    "status_fg",
                    "status_bg",
                ],
            );
        }
    }
}

fn warn_unknown_in_table(table: &toml::map::Map<String, toml::Value>, prefix: &str, known: &[&str]) {
    let known: HashSet<&str> = known.iter().copied().collect();
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            eprintln!("warning: unknown configuration key `{}{}`", prefix, key);
        }
    }
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}
