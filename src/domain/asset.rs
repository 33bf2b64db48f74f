//! Mapping from a detected host to the release asset built for it.

use crate::domain::error::ArchitectureError;

/// Project prefix of every release asset.
pub const PROJECT: &str = "aurelia";

/// Distributions built on musl libc, served the statically linked build.
const MUSL_DISTROS: &[&str] = &["alpine"];

/// CPU architecture families that have a release build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetArch {
    X86_64,
    Aarch64,
}

impl AssetArch {
    /// Normalise a `uname -m` value.
    #[must_use]
    pub fn from_uname(arch: &str) -> Option<Self> {
        match arch.trim() {
            "x86_64" | "amd64" => Some(Self::X86_64),
            "aarch64" | "arm64" => Some(Self::Aarch64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }
}

/// Resolve the archive name for a host.
///
/// x86_64 hosts on a musl distribution get the `-musl` build; every other
/// supported host gets the generic glibc build. Pure function.
///
/// # Errors
///
/// Returns `UnsupportedArchitecture` for any architecture outside the table.
pub fn resolve_asset(arch: &str, os: &str) -> Result<String, ArchitectureError> {
    let family = AssetArch::from_uname(arch).ok_or_else(|| {
        ArchitectureError::UnsupportedArchitecture {
            arch: arch.trim().to_string(),
            os: os.trim().to_string(),
        }
    })?;
    let musl = family == AssetArch::X86_64 && MUSL_DISTROS.contains(&os.trim());
    let suffix = if musl { "-musl" } else { "" };
    Ok(format!("{PROJECT}-linux-{}{suffix}.tar.gz", family.as_str()))
}
