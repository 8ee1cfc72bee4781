//! Resolution pipeline: reads data files, resolves `base` references, builds
//! the registry.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus the entry points that turn a data directory
//! into a ready [`FlowEngine`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use brewflow_core::registry::{PartTypeDef, Registry, RegistryBuilder, RegistryError};
use brewflow_flow::{FlowConfig, FlowEngine, FlowError};
use serde::de::DeserializeOwned;

use crate::schema::{LayoutData, PartTypeData};

/// Compiled-in part table.
pub const BUILTIN_PARTS: &str = include_str!("../data/parts.ron");

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved table failed validation.
    #[error("invalid part table {file}: {source}")]
    Registry {
        file: PathBuf,
        #[source]
        source: RegistryError,
    },

    /// The engine settings were rejected.
    #[error(transparent)]
    Engine(#[from] FlowError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, DataLoadError> {
    let parse_err = |detail: String| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    tracing::debug!(file = %path.display(), ?format, "reading data file");
    parse_str(&content, format, path)
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    if format != Format::Toml {
        return deserialize_file(path);
    }

    let table: toml::Value = deserialize_file(path)?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: format!("missing key '{toml_key}' in TOML file"),
        })?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        })
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Part tables
// ===========================================================================

/// Resolve part type entries (in file order) into a validated registry.
///
/// `base` must name an entry earlier in the list. Aliases may not shadow a
/// type name or another alias.
pub fn build_registry(types: &[PartTypeData], file: &Path) -> Result<Registry, DataLoadError> {
    let mut resolved: HashMap<String, PartTypeDef> = HashMap::with_capacity(types.len());
    let mut aliases: HashMap<String, String> = HashMap::new();
    let mut builder = RegistryBuilder::new();

    for data in types {
        check_duplicate(&resolved, &data.name, file)?;
        check_duplicate(&aliases, &data.name, file)?;
        let base = match &data.base {
            Some(base) => Some(resolve_name(&resolved, base, file, "base part type")?),
            None => None,
        };
        let def = data.to_def(base);
        builder.register(def.clone());
        resolved.insert(data.name.clone(), def);

        for alias in &data.aliases {
            check_duplicate(&resolved, alias, file)?;
            check_duplicate(&aliases, alias, file)?;
            builder.register_alias(alias, &data.name);
            aliases.insert(alias.clone(), data.name.clone());
        }
    }

    let registry = builder.build().map_err(|source| DataLoadError::Registry {
        file: file.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        file = %file.display(),
        types = registry.type_count(),
        aliases = aliases.len(),
        "part table loaded"
    );
    Ok(registry)
}

/// Load and validate a part table file.
pub fn load_part_table(path: &Path) -> Result<Registry, DataLoadError> {
    let types: Vec<PartTypeData> = deserialize_list(path, "parts")?;
    build_registry(&types, path)
}

/// The compiled-in part table.
pub fn builtin_part_types() -> Result<Vec<PartTypeData>, DataLoadError> {
    parse_str(BUILTIN_PARTS, Format::Ron, Path::new("<builtin>/parts.ron"))
}

/// Registry built from the compiled-in part table.
pub fn builtin_registry() -> Result<Registry, DataLoadError> {
    build_registry(&builtin_part_types()?, Path::new("<builtin>/parts.ron"))
}

// ===========================================================================
// Engine settings and full setup
// ===========================================================================

/// Load engine settings. Missing fields take their defaults.
pub fn load_engine_config(path: &Path) -> Result<FlowConfig, DataLoadError> {
    deserialize_file(path)
}

/// A loaded part table plus engine settings.
#[derive(Debug, Clone)]
pub struct FlowSetup {
    pub registry: Registry,
    pub config: FlowConfig,
}

impl FlowSetup {
    /// Built-in table, default settings.
    pub fn builtin() -> Result<Self, DataLoadError> {
        Ok(Self {
            registry: builtin_registry()?,
            config: FlowConfig::default(),
        })
    }

    pub fn into_engine(self) -> Result<FlowEngine, DataLoadError> {
        Ok(FlowEngine::with_config(self.registry, self.config)?)
    }
}

/// Load a data directory.
///
/// Required: `parts.{ron,toml,json}`. Optional: `engine.{ron,toml,json}`.
pub fn load_flow_setup(dir: &Path) -> Result<FlowSetup, DataLoadError> {
    let parts_path = require_data_file(dir, "parts")?;
    let registry = load_part_table(&parts_path)?;
    let config = match find_data_file(dir, "engine")? {
        Some(path) => load_engine_config(&path)?,
        None => FlowConfig::default(),
    };
    Ok(FlowSetup { registry, config })
}

// ===========================================================================
// Layouts
// ===========================================================================

/// Load a layout document from a file.
pub fn load_layout(path: &Path) -> Result<LayoutData, DataLoadError> {
    deserialize_file(path)
}

/// Parse a layout document from JSON text, as persisted by the editor.
pub fn parse_layout_json(json: &str) -> Result<LayoutData, DataLoadError> {
    parse_str(json, Format::Json, Path::new("<layout>"))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use brewflow_core::test_utils::*;
    use brewflow_flow::SplitPolicy;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "brewflow_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Clean up a test directory.
    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const SMALL_TABLE: &str = r#"
        #![enable(implicit_some)]
        [
            (name: "StraightTube", ports: [(angle: 270), (angle: 90)]),
            (name: "Pump", aliases: ["PwmPump"],
             behavior: Pump(default: 30.0, min: 5.0, max: 100.0),
             ports: [(angle: 270, kind: intake), (angle: 90, kind: outlet)]),
        ]
    "#;

    // -----------------------------------------------------------------------
    // detect_format / find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("parts.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("parts.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("parts.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        for name in ["parts.yaml", "parts"] {
            assert!(matches!(
                detect_format(Path::new(name)),
                Err(DataLoadError::UnsupportedFormat { .. })
            ));
        }
    }

    #[test]
    fn find_data_file_cases() {
        let dir = make_test_dir("find");
        assert_eq!(find_data_file(&dir, "parts").unwrap(), None);

        fs::write(dir.join("parts.json"), "[]").unwrap();
        assert_eq!(
            find_data_file(&dir, "parts").unwrap(),
            Some(dir.join("parts.json"))
        );

        fs::write(dir.join("parts.ron"), "[]").unwrap();
        assert!(matches!(
            find_data_file(&dir, "parts"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");
        let err = require_data_file(&dir, "parts").unwrap_err();
        assert!(matches!(err, DataLoadError::MissingRequired { .. }));
        assert!(err.to_string().contains("parts"));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Part tables
    // -----------------------------------------------------------------------

    #[test]
    fn load_part_table_ron() {
        let dir = make_test_dir("table_ron");
        let path = dir.join("parts.ron");
        fs::write(&path, SMALL_TABLE).unwrap();

        let registry = load_part_table(&path).unwrap();
        assert_eq!(registry.type_count(), 2);
        assert_eq!(registry.resolve("PwmPump"), registry.resolve("Pump"));

        cleanup(&dir);
    }

    #[test]
    fn load_part_table_toml() {
        let dir = make_test_dir("table_toml");
        let path = dir.join("parts.toml");
        fs::write(
            &path,
            r#"
[[parts]]
name = "StraightTube"
ports = [{ angle = 270 }, { angle = 90 }]

[[parts]]
name = "Valve"
base = "StraightTube"
behavior = "Valve"
"#,
        )
        .unwrap();

        let registry = load_part_table(&path).unwrap();
        let valve = registry.get_type(registry.resolve("Valve").unwrap()).unwrap();
        assert_eq!(valve.ports.len(), 2);

        cleanup(&dir);
    }

    #[test]
    fn unknown_base_is_unresolved() {
        let types: Vec<PartTypeData> =
            serde_json::from_str(r#"[{"name": "Keg", "base": "Kettle"}]"#).unwrap();
        let err = build_registry(&types, Path::new("parts.json")).unwrap_err();
        assert!(matches!(err, DataLoadError::UnresolvedRef { ref name, .. } if name == "Kettle"));
    }

    #[test]
    fn duplicate_names_and_aliases_are_rejected() {
        let types: Vec<PartTypeData> = serde_json::from_str(
            r#"[{"name": "Tube", "ports": [{"angle": 90}]}, {"name": "Tube"}]"#,
        )
        .unwrap();
        assert!(matches!(
            build_registry(&types, Path::new("parts.json")),
            Err(DataLoadError::DuplicateName { .. })
        ));

        let types: Vec<PartTypeData> = serde_json::from_str(
            r#"[{"name": "Tube", "aliases": ["Pipe"]}, {"name": "Pipe"}]"#,
        )
        .unwrap();
        assert!(matches!(
            build_registry(&types, Path::new("parts.json")),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "Pipe"
        ));
    }

    #[test]
    fn non_cardinal_port_fails_at_load() {
        let types: Vec<PartTypeData> =
            serde_json::from_str(r#"[{"name": "Odd", "ports": [{"angle": 45}]}]"#).unwrap();
        let err = build_registry(&types, Path::new("parts.json")).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::Registry {
                source: RegistryError::NonCardinalPort { .. },
                ..
            }
        ));
    }

    #[test]
    fn builtin_table_is_valid() {
        let registry = builtin_registry().unwrap();
        for name in [STRAIGHT, ELBOW, TEE, CROSS, VALVE, PUMP, INLET, OUTLET, KETTLE, SENSOR] {
            assert!(registry.resolve(name).is_some(), "missing {name}");
        }
        assert_eq!(registry.resolve("PwmPump"), registry.resolve(PUMP));
        assert_eq!(registry.resolve("SmallKettle"), registry.resolve(KETTLE));
    }

    // -----------------------------------------------------------------------
    // Directory setup
    // -----------------------------------------------------------------------

    #[test]
    fn load_flow_setup_with_engine_file() {
        let dir = make_test_dir("setup");
        fs::write(dir.join("parts.ron"), SMALL_TABLE).unwrap();
        fs::write(
            dir.join("engine.toml"),
            "split_policy = \"conductance\"\ncache_capacity = 4\n",
        )
        .unwrap();

        let setup = load_flow_setup(&dir).unwrap();
        assert_eq!(setup.config.split_policy, SplitPolicy::Conductance);
        assert_eq!(setup.config.cache_capacity, 4);
        assert_eq!(setup.config.spill_friction, 1.0);
        assert!(setup.into_engine().is_ok());

        cleanup(&dir);
    }

    #[test]
    fn load_flow_setup_defaults_engine() {
        let dir = make_test_dir("setup_default");
        fs::write(dir.join("parts.json"), r#"[{"name": "Tube", "ports": [{"angle": 0}]}]"#)
            .unwrap();

        let setup = load_flow_setup(&dir).unwrap();
        assert_eq!(setup.config, FlowConfig::default());

        cleanup(&dir);
    }

    #[test]
    fn bad_engine_settings_are_rejected() {
        let setup = FlowSetup {
            registry: standard_registry(),
            config: FlowConfig {
                spill_friction: -1.0,
                ..FlowConfig::default()
            },
        };
        assert!(matches!(
            setup.into_engine(),
            Err(DataLoadError::Engine(FlowError::InvalidSpillFriction(_)))
        ));
    }

    // -----------------------------------------------------------------------
    // Layouts
    // -----------------------------------------------------------------------

    #[test]
    fn load_layout_file() {
        let dir = make_test_dir("layout");
        let path = dir.join("brewhouse.json");
        fs::write(
            &path,
            r#"{"title": "HLT", "parts": [{"id": "a", "type": "StraightTube", "x": 1, "y": 2}]}"#,
        )
        .unwrap();

        let layout = load_layout(&path).unwrap();
        assert_eq!(layout.title, "HLT");
        assert_eq!(layout.parts[0].id.as_str(), "a");

        cleanup(&dir);
    }

    #[test]
    fn parse_layout_error_names_source() {
        let err = parse_layout_json("{not json").unwrap_err();
        assert!(err.to_string().contains("<layout>"));
    }
}
