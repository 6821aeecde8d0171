//! Package ecosystems supported by depsaurus and project type detection.
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub mod detection;

/// Package-management platform of a scanned repository.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// Node.js packages declared in package.json
    Npm,
    /// Python packages pinned in requirements.txt
    Pip,
    /// Java packages declared in pom.xml
    Maven,
    /// Java packages declared in build.gradle / build.gradle.kts
    Gradle,
    #[default]
    Unknown,
}

impl Ecosystem {
    /// Source file extensions scanned for usages of a dependency.
    pub fn source_extensions(&self) -> &'static [&'static str] {
        match self {
            Ecosystem::Npm => &["js", "jsx", "ts", "tsx"],
            Ecosystem::Pip => &["py"],
            Ecosystem::Maven | Ecosystem::Gradle => &["java", "kt", "scala"],
            Ecosystem::Unknown => &[],
        }
    }

    /// Maven and Gradle share `group:artifact` naming and Maven Central.
    pub fn is_jvm(&self) -> bool {
        matches!(self, Ecosystem::Maven | Ecosystem::Gradle)
    }
}
