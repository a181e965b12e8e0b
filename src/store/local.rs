//! Plugins directory store.
//!
//! Each installed package lives in `<plugins_dir>/<name>/` (or
//! `<plugins_dir>/@scope/<name>/`) and carries a `package.json` manifest with
//! at least `name` and `version`. Installation is delegated to an external
//! installer (npm compatible) that stages the package under the temp
//! directory. The staged package is then moved into the plugins directory and
//! the dependencies the installer placed next to it go into its own
//! `node_modules`.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::{
    name_components, validate_package_name, InstalledPackage, PackageStore, Result, StoreError,
};
use crate::config::Settings;

/// Manifest file read from every package directory.
const MANIFEST_FILE: &str = "package.json";

/// Dependencies directory used by the installer.
const NODE_MODULES: &str = "node_modules";

/// The subset of `package.json` this store cares about.
#[derive(Debug, Deserialize)]
struct Manifest {
    name: String,
    #[serde(default)]
    version: String,
}

/// A package found on disk, with the directory it was read from.
#[derive(Debug, Clone)]
struct ListedPackage {
    dir: PathBuf,
    package: InstalledPackage,
}

/// A store backed by a plugins directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    /// Directory holding one subdirectory per installed package.
    plugins_dir: PathBuf,
    /// Staging directory for installs.
    temp_dir: PathBuf,
    /// Installer executable (invoked as `<installer> install --no-save --prefix <dir> <name>@<range>`).
    installer: String,
}

impl LocalStore {
    /// Create a store for the given directories.
    pub fn new(
        plugins_dir: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
        installer: impl Into<String>,
    ) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            temp_dir: temp_dir.into(),
            installer: installer.into(),
        }
    }

    /// Create a store from application settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.plugins_dir,
            &settings.temp_dir,
            &settings.installer_command,
        )
    }

    fn package_dir(&self, name: &str) -> PathBuf {
        name_components(name)
            .into_iter()
            .fold(self.plugins_dir.clone(), |dir, part| dir.join(part))
    }

    /// Staging prefix for `name`. Scoped names are flattened to one level.
    fn stage_dir(&self, name: &str) -> PathBuf {
        self.temp_dir.join(name.replace('/', "+"))
    }

    /// Run the installer into a fresh staging prefix.
    async fn stage(&self, name: &str, version_range: &str, stage_dir: &Path) -> Result<PathBuf> {
        if stage_dir.exists() {
            tokio::fs::remove_dir_all(stage_dir).await?;
        }
        tokio::fs::create_dir_all(stage_dir).await?;

        let spec = format!("{}@{}", name, version_range);
        debug!("Running {} install for {}", self.installer, spec);

        let output = Command::new(&self.installer)
            .arg("install")
            .arg("--no-save")
            .arg("--prefix")
            .arg(stage_dir)
            .arg(&spec)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| StoreError::install(name, format!("could not run {}: {}", self.installer, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| output.status.to_string());
            return Err(StoreError::install(name, reason));
        }

        let staged = name_components(name)
            .into_iter()
            .fold(stage_dir.join(NODE_MODULES), |dir, part| dir.join(part));
        if !staged.join(MANIFEST_FILE).exists() {
            return Err(StoreError::install(
                name,
                "installer finished but the package was not found",
            ));
        }
        Ok(staged)
    }

    async fn listing(&self) -> Result<Vec<ListedPackage>> {
        let dir = self.plugins_dir.clone();
        let listing = tokio::task::spawn_blocking(move || read_listing(&dir))
            .await
            .map_err(|e| io::Error::other(format!("listing task failed: {e}")))?;
        Ok(listing)
    }
}

#[async_trait]
impl PackageStore for LocalStore {
    #[instrument(skip(self), fields(dir = %self.plugins_dir.display()))]
    async fn list(&self) -> Result<Vec<InstalledPackage>> {
        let packages: Vec<InstalledPackage> =
            self.listing().await?.into_iter().map(|p| p.package).collect();
        debug!("Found {} installed packages", packages.len());
        Ok(packages)
    }

    #[instrument(skip(self))]
    async fn install(&self, name: &str, version_range: &str) -> Result<()> {
        validate_package_name(name)?;

        let stage_dir = self.stage_dir(name);
        let result = async {
            let staged = self.stage(name, version_range, &stage_dir).await?;

            let target = self.package_dir(name);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            if target.exists() {
                tokio::fs::remove_dir_all(&target)
                    .await
                    .map_err(|e| StoreError::install(name, e))?;
            }
            tokio::fs::rename(&staged, &target)
                .await
                .map_err(|e| StoreError::install(name, e))?;

            let moved = move_dependencies(&stage_dir.join(NODE_MODULES), &target.join(NODE_MODULES))
                .await
                .map_err(|e| StoreError::install(name, e))?;
            debug!("Moved {} dependencies of {}", moved, name);
            Ok::<(), StoreError>(())
        }
        .await;

        if let Err(e) = tokio::fs::remove_dir_all(&stage_dir).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to clean staging directory {:?}: {}", stage_dir, e);
            }
        }

        if result.is_ok() {
            info!("Installed {}@{}", name, version_range);
        }
        result
    }

    /// Remove the directory of the package whose manifest is named `name`.
    ///
    /// A directory named after the package without a readable manifest is
    /// removed as well.
    #[instrument(skip(self))]
    async fn remove(&self, name: &str) -> Result<()> {
        validate_package_name(name)?;

        let fallback = self.package_dir(name);
        let dir = self
            .listing()
            .await?
            .into_iter()
            .find(|p| p.package.name == name)
            .map(|p| p.dir)
            .or_else(|| fallback.is_dir().then_some(fallback))
            .ok_or_else(|| StoreError::NotInstalled(name.to_string()))?;

        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| StoreError::remove(name, e))?;

        // drop the scope directory once its last package is gone
        if let Some(parent) = dir.parent() {
            if parent != self.plugins_dir && parent.file_name().is_some_and(is_scope) {
                let _ = tokio::fs::remove_dir(parent).await;
            }
        }

        info!("Removed {}", name);
        Ok(())
    }
}

fn is_scope(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('@')
}

/// Move everything the installer left in `from` into `to`.
///
/// Scope directories are merged one level deep. Entries that already exist
/// in `to` are kept. Returns the number of entries moved.
async fn move_dependencies(from: &Path, to: &Path) -> io::Result<usize> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf(), true)];
    let mut moved = 0;

    while let Some((src, dest, top_level)) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&src).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let target = dest.join(&file_name);

            if top_level && is_scope(&file_name) && entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target, false));
                continue;
            }

            if tokio::fs::try_exists(&target).await? {
                debug!("Keeping existing {:?}", target);
                continue;
            }

            tokio::fs::create_dir_all(&dest).await?;
            tokio::fs::rename(entry.path(), &target).await?;
            moved += 1;
        }
    }

    Ok(moved)
}

/// Read every package manifest under `dir`, one level deep plus one more
/// inside `@scope` directories.
///
/// Directories without a readable manifest are skipped.
fn read_listing(dir: &Path) -> Vec<ListedPackage> {
    if !dir.exists() {
        return Vec::new();
    }

    let mut packages: Vec<ListedPackage> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(2)
        .into_iter()
        .filter_entry(|e| {
            e.depth() <= 1 || e.path().parent().and_then(Path::file_name).is_some_and(is_scope)
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| !(e.depth() == 1 && is_scope(e.file_name())))
        .filter_map(|entry| match read_manifest(&entry.path().join(MANIFEST_FILE)) {
            Ok(package) => Some(ListedPackage {
                dir: entry.into_path(),
                package,
            }),
            Err(e) => {
                debug!("Skipping {:?}: {}", entry.path(), e);
                None
            }
        })
        .collect();

    packages.sort_by(|a, b| a.package.name.cmp(&b.package.name));
    packages
}

fn read_manifest(path: &Path) -> Result<InstalledPackage> {
    let content = std::fs::read_to_string(path)?;
    let manifest: Manifest =
        serde_json::from_str(&content).map_err(|e| StoreError::InvalidManifest {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(InstalledPackage::new(manifest.name, manifest.version))
}
