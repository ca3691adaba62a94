use crate::Instance;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_INSTS_DIR: &str = "./insts";

/// Where to find the simulation binary for one device instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub instance: Instance,
    #[serde(default = "default_insts_dir")]
    pub insts_dir: PathBuf,
    /// Explicit binary path; overrides `instance` and `insts_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_insts_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INSTS_DIR)
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            instance: Instance::default(),
            insts_dir: default_insts_dir(),
            path: None,
        }
    }
}

impl DeviceConfig {
    pub fn for_instance(instance: Instance) -> Self {
        Self {
            instance,
            ..Self::default()
        }
    }

    /// Binary path for this configuration. Windows builds ship the instances
    /// as `<instance>.exe` in the working directory.
    pub fn resolve_path(&self) -> PathBuf {
        if let Some(p) = &self.path {
            return p.clone();
        }
        if cfg!(windows) {
            PathBuf::from(format!(".\\{}.exe", self.instance))
        } else {
            self.insts_dir.join(self.instance.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let cfg = DeviceConfig {
            instance: Instance::Impl2,
            insts_dir: PathBuf::from("/opt/insts"),
            path: Some(PathBuf::from("/tmp/custom")),
        };
        assert_eq!(cfg.resolve_path(), PathBuf::from("/tmp/custom"));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_instance_under_insts_dir() {
        let cfg = DeviceConfig::for_instance(Instance::Impl4);
        assert_eq!(cfg.resolve_path(), PathBuf::from("./insts/impl4"));
    }

    #[cfg(windows)]
    #[test]
    fn test_instance_exe_on_windows() {
        let cfg = DeviceConfig::for_instance(Instance::Impl4);
        assert_eq!(cfg.resolve_path(), PathBuf::from(".\\impl4.exe"));
    }
}
