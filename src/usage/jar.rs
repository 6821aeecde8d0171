//! Java packages shipped in a dependency's jar.
//!
//! Group ids often differ from the packages an artifact actually ships
//! (`com.google.guava:guava` lives in `com.google.common`), so JVM usage
//! scans can be widened with the package names read from the jar itself.
//! The jar is fetched into a scratch directory with the Maven dependency
//! plugin; when Maven or the jar is unavailable the scan keeps its
//! coordinate-based patterns.
use async_trait::async_trait;
use log::*;
use std::{
    collections::BTreeSet,
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::TempDir;
use zip::ZipArchive;

use crate::{
    error::{DepsaurusError, Result},
    manifest::split_coordinates,
    process::run_command,
    result::Outcome,
};

pub const MVN_PROGRAM: &str = "mvn";

const COPY_GOAL: &str =
    "org.apache.maven.plugins:maven-dependency-plugin:3.1.2:copy";

/// Source of the Java packages published by a JVM artifact.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageSource {
    /// Packages shipped by `coordinates` (`group:artifact`) at `version`.
    /// Soft failures carry an empty list.
    async fn packages(
        &self,
        coordinates: &str,
        version: &str,
    ) -> Outcome<Vec<String>>;
}

/// Copies the artifact jar with `mvn dependency:copy` and lists its
/// packages.
pub struct MavenJarPackages {
    program: String,
    process_timeout: Duration,
}

impl MavenJarPackages {
    pub fn new(process_timeout: Duration) -> Self {
        Self {
            program: MVN_PROGRAM.into(),
            process_timeout,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn copy_jar(
        &self,
        scratch: &Path,
        group: &str,
        artifact: &str,
        version: &str,
    ) -> Result<PathBuf> {
        let artifact_arg = format!("-Dartifact={group}:{artifact}:{version}");
        let output_arg = format!("-DoutputDirectory={}", scratch.display());

        let output = run_command(
            &self.program,
            &[COPY_GOAL, &artifact_arg, &output_arg],
            scratch,
            self.process_timeout,
        )
        .await?;

        let jar = scratch.join(format!("{artifact}-{version}.jar"));
        if !output.success || !jar.exists() {
            return Err(DepsaurusError::process(
                format!("{} {COPY_GOAL}", self.program),
                format!("no {} after exit {:?}", jar.display(), output.code),
            ));
        }

        Ok(jar)
    }
}

#[async_trait]
impl PackageSource for MavenJarPackages {
    async fn packages(
        &self,
        coordinates: &str,
        version: &str,
    ) -> Outcome<Vec<String>> {
        let Some((group, artifact)) = split_coordinates(coordinates) else {
            return Outcome::Failed(DepsaurusError::InvalidArgs(format!(
                "expected group:artifact, got {coordinates}"
            )));
        };

        let scratch = match TempDir::new() {
            Ok(scratch) => scratch,
            Err(err) => return Outcome::Failed(err.into()),
        };

        let jar = match self
            .copy_jar(scratch.path(), group, artifact, version)
            .await
        {
            Ok(jar) => jar,
            Err(err) => {
                warn!("jar of {coordinates}:{version} unavailable: {err}");
                return Outcome::degraded(vec![], err.to_string());
            }
        };

        match package_names(&jar) {
            Ok(packages) => {
                info!(
                    "{coordinates}:{version} ships {} packages",
                    packages.len()
                );
                Outcome::Success(packages)
            }
            Err(err) => {
                warn!("cannot read {}: {err}", jar.display());
                Outcome::degraded(vec![], err.to_string())
            }
        }
    }
}

/// Sorted, distinct packages holding `.class` entries in `jar`. Entries
/// under `META-INF` and classes in the default package are ignored.
pub fn package_names(jar: &Path) -> Result<Vec<String>> {
    let archive = ZipArchive::new(File::open(jar)?)?;

    let packages = archive
        .file_names()
        .filter(|name| {
            name.ends_with(".class") && !name.starts_with("META-INF")
        })
        .filter_map(|name| name.rsplit_once('/'))
        .map(|(dir, _)| dir.replace('/', "."))
        .filter(|package| !package.is_empty())
        .collect::<BTreeSet<String>>();

    Ok(packages.into_iter().collect())
}

/// Drop packages whose parent package is also listed; a reference to a
/// subpackage already contains its ancestor's name.
pub fn root_packages(packages: &[String]) -> Vec<String> {
    let listed = packages.iter().map(String::as_str).collect::<BTreeSet<_>>();

    listed
        .iter()
        .filter(|package| {
            !package
                .match_indices('.')
                .any(|(i, _)| listed.contains(&package[..i]))
        })
        .map(|package| package.to_string())
        .collect()
}
