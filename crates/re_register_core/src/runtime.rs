use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::authors::{AUTHORS_FILENAME, AUTHORS_MAPPING_FILENAME};
use crate::fsutil::normalize_path;
use crate::volumes::Volumes;

pub const STATE_DIR_NAME: &str = ".re_register";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Heuristic,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub state_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub root_source: ValueSource,
    pub data_source: ValueSource,
    pub config_source: ValueSource,
}

impl ResolvedPaths {
    pub fn diagnostics(&self) -> String {
        format!(
            "project_root={} ({})\nstate_dir={}\ndata_dir={} ({})\nconfig_path={} ({})",
            normalize_path(&self.project_root),
            self.root_source.as_str(),
            normalize_path(&self.state_dir),
            normalize_path(&self.data_dir),
            self.data_source.as_str(),
            normalize_path(&self.config_path),
            self.config_source.as_str(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeStatus {
    pub data_dir_exists: bool,
    pub config_exists: bool,
    pub authors_exists: bool,
    pub authors_mapping_exists: bool,
    pub register_files: usize,
    pub warnings: Vec<String>,
}

pub fn inspect_runtime(paths: &ResolvedPaths) -> Result<RuntimeStatus> {
    let data_dir_exists = paths.data_dir.exists();
    let config_exists = paths.config_path.exists();
    let authors_exists = paths.data_dir.join(AUTHORS_FILENAME).exists();
    let authors_mapping_exists = paths.data_dir.join(AUTHORS_MAPPING_FILENAME).exists();

    let mut register_files = 0;
    if data_dir_exists {
        let known: HashSet<String> = Volumes::new()
            .iter()
            .map(|volume| format!("{}.json", volume.file_name()))
            .collect();
        for entry in fs::read_dir(&paths.data_dir)
            .with_context(|| format!("failed to list {}", paths.data_dir.display()))?
        {
            let entry = entry
                .with_context(|| format!("failed to list {}", paths.data_dir.display()))?;
            if known.contains(entry.file_name().to_string_lossy().as_ref()) {
                register_files += 1;
            }
        }
    }

    let mut warnings = Vec::new();
    if !data_dir_exists {
        warnings.push(format!(
            "data directory {} is missing; no registers can be loaded",
            normalize_path(&paths.data_dir)
        ));
    }
    if data_dir_exists && (!authors_exists || !authors_mapping_exists) {
        warnings.push(format!(
            "{AUTHORS_FILENAME} or {AUTHORS_MAPPING_FILENAME} is missing; registers cannot be loaded"
        ));
    }
    if data_dir_exists && register_files == 0 {
        warnings.push("no volume register files found".to_string());
    }

    Ok(RuntimeStatus {
        data_dir_exists,
        config_exists,
        authors_exists,
        authors_mapping_exists,
        register_files,
        warnings,
    })
}

pub fn resolve_paths(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> Result<ResolvedPaths> {
    resolve_paths_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> Result<ResolvedPaths>
where
    F: Fn(&str) -> Option<String>,
{
    let (project_root, root_source) = resolve_project_root(context, overrides, &lookup_env);
    let state_dir = project_root.join(STATE_DIR_NAME);

    let (data_dir, data_source) = if let Some(path) = overrides.data_dir.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = lookup_env("RE_REGISTER_DATA_DIR") {
        (
            absolutize(Path::new(value.trim()), &project_root),
            ValueSource::Env,
        )
    } else {
        (project_root.join("data"), ValueSource::Default)
    };

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = lookup_env("RE_REGISTER_CONFIG") {
        (
            absolutize(Path::new(value.trim()), &project_root),
            ValueSource::Env,
        )
    } else {
        (state_dir.join("config.toml"), ValueSource::Default)
    };

    Ok(ResolvedPaths {
        project_root,
        state_dir,
        data_dir,
        config_path,
        root_source,
        data_source,
        config_source,
    })
}

fn resolve_project_root<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: &F,
) -> (PathBuf, ValueSource)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.project_root.as_deref() {
        return (absolutize(path, &context.cwd), ValueSource::Flag);
    }

    if let Some(value) = lookup_env("RE_REGISTER_PROJECT_ROOT") {
        return (
            absolutize(Path::new(value.trim()), &context.cwd),
            ValueSource::Env,
        );
    }

    match context
        .cwd
        .ancestors()
        .find(|candidate| candidate.join(STATE_DIR_NAME).is_dir())
    {
        Some(root) => (root.to_path_buf(), ValueSource::Heuristic),
        None => (context.cwd.clone(), ValueSource::Default),
    }
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use tempfile::tempdir;

    use super::{
        PathOverrides, ResolutionContext, STATE_DIR_NAME, ValueSource, inspect_runtime,
        resolve_paths_with_lookup,
    };

    #[test]
    fn resolve_paths_prefers_flag_over_env() {
        let temp = tempdir().expect("tempdir");
        let cwd = temp.path().join("cwd");
        let from_flag = temp.path().join("flag-root");
        fs::create_dir_all(&cwd).expect("create cwd");

        let overrides = PathOverrides {
            project_root: Some(from_flag.clone()),
            ..PathOverrides::default()
        };
        let context = ResolutionContext { cwd: cwd.clone() };

        let env = HashMap::from([(
            "RE_REGISTER_PROJECT_ROOT".to_string(),
            temp.path().join("env-root").to_string_lossy().to_string(),
        )]);

        let resolved = resolve_paths_with_lookup(&context, &overrides, |key| env.get(key).cloned())
            .expect("resolve paths");
        assert_eq!(resolved.project_root, from_flag);
        assert_eq!(resolved.root_source, ValueSource::Flag);
        assert_eq!(resolved.data_dir, from_flag.join("data"));
        assert_eq!(
            resolved.config_path,
            from_flag.join(STATE_DIR_NAME).join("config.toml")
        );
    }

    #[test]
    fn resolve_paths_finds_state_dir_in_ancestors() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("project");
        let nested = root.join("data").join("deep");
        fs::create_dir_all(root.join(STATE_DIR_NAME)).expect("state dir");
        fs::create_dir_all(&nested).expect("nested");

        let context = ResolutionContext { cwd: nested };
        let resolved = resolve_paths_with_lookup(&context, &PathOverrides::default(), |_| None)
            .expect("resolve");
        assert_eq!(resolved.project_root, root);
        assert_eq!(resolved.root_source, ValueSource::Heuristic);
    }

    #[test]
    fn resolve_paths_uses_env_for_data_and_config() {
        let temp = tempdir().expect("tempdir");
        let context = ResolutionContext {
            cwd: temp.path().to_path_buf(),
        };
        let env = HashMap::from([
            ("RE_REGISTER_DATA_DIR".to_string(), "register-data".to_string()),
            ("RE_REGISTER_CONFIG".to_string(), "conf/re.toml".to_string()),
        ]);
        let resolved =
            resolve_paths_with_lookup(&context, &PathOverrides::default(), |key| {
                env.get(key).cloned()
            })
            .expect("resolve");
        assert_eq!(resolved.data_dir, resolved.project_root.join("register-data"));
        assert_eq!(resolved.data_source, ValueSource::Env);
        assert_eq!(resolved.config_path, resolved.project_root.join("conf/re.toml"));
        assert_eq!(resolved.config_source, ValueSource::Env);
        assert!(resolved.diagnostics().contains("data_dir="));
    }

    #[test]
    fn inspect_runtime_counts_register_files() {
        let temp = tempdir().expect("tempdir");
        let context = ResolutionContext {
            cwd: temp.path().to_path_buf(),
        };
        let paths = resolve_paths_with_lookup(&context, &PathOverrides::default(), |_| None)
            .expect("resolve");

        let status = inspect_runtime(&paths).expect("inspect");
        assert!(!status.data_dir_exists);
        assert!(!status.warnings.is_empty());

        fs::create_dir_all(&paths.data_dir).expect("data dir");
        fs::write(paths.data_dir.join("I_1.json"), "[]").expect("register");
        fs::write(paths.data_dir.join("S_I.json"), "[]").expect("register");
        fs::write(paths.data_dir.join("notes.json"), "[]").expect("other");
        fs::write(paths.data_dir.join("authors.json"), "{}").expect("authors");
        fs::write(paths.data_dir.join("authors_mapping.json"), "{}").expect("mapping");

        let status = inspect_runtime(&paths).expect("inspect");
        assert_eq!(status.register_files, 2);
        assert!(status.authors_exists);
        assert!(status.warnings.is_empty());
    }
}
