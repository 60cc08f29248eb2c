// Fri Oct 16 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which C++ ABI the caller primarily targets. Both RTTI shapes are always
/// built; this only decides platform-specific builtin sizes and which shape
/// the dumps lead with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Abi {
    Itanium,
    Msvc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub pointer_size: usize,
    pub pointer_alignment: usize,
    pub abi: Abi,
    pub rtti: bool,
    pub default_pack: Option<usize>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self::x86_64()
    }
}

impl TargetConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x86_64() -> Self {
        Self {
            pointer_size: 8,
            pointer_alignment: 8,
            abi: Abi::Itanium,
            rtti: true,
            default_pack: None,
        }
    }

    pub fn i686() -> Self {
        Self {
            pointer_size: 4,
            pointer_alignment: 4,
            ..Self::x86_64()
        }
    }

    pub fn x86_64_msvc() -> Self {
        Self {
            abi: Abi::Msvc,
            ..Self::x86_64()
        }
    }

    /// Resolves a preset by its command-line name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "x86_64" | "x86-64" | "amd64" => Some(Self::x86_64()),
            "i686" | "x86" => Some(Self::i686()),
            "x86_64-msvc" | "x64-msvc" => Some(Self::x86_64_msvc()),
            _ => None,
        }
    }

    pub fn with_rtti(mut self, rtti: bool) -> Self {
        self.rtti = rtti;
        self
    }

    pub fn with_default_pack(mut self, pack: usize) -> Self {
        self.default_pack = Some(pack);
        self
    }

    /// Size of `long` on this target: 4 under the Microsoft ABI (LLP64).
    pub fn long_size(&self) -> usize {
        match self.abi {
            Abi::Msvc => 4,
            Abi::Itanium => self.pointer_size,
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.pointer_size == 0 || !self.pointer_size.is_power_of_two() {
            return Err(format!("pointer_size must be a power of two, got {}", self.pointer_size));
        }
        if self.pointer_alignment == 0 || !self.pointer_alignment.is_power_of_two() {
            return Err(format!(
                "pointer_alignment must be a power of two, got {}",
                self.pointer_alignment
            ));
        }
        if let Some(pack) = self.default_pack {
            if pack == 0 || !pack.is_power_of_two() {
                return Err(format!("default_pack must be a power of two, got {}", pack));
            }
        }
        Ok(())
    }
}
