/*!
Structs to hold configuration data.
*/
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Deserialize)]
struct ConfigFile {
    storage_path: Option<PathBuf>,
    seed_demo_users: Option<bool>,
}

#[derive(Debug)]
pub struct Cfg {
    /// Where the file-backed storage lives.
    pub storage_path: PathBuf,
    /// Whether an empty registry gets the demonstration users.
    pub seed_demo_users: bool,
}

impl std::default::Default for Cfg {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("campus_data.json"),
            seed_demo_users: true,
        }
    }
}

impl Cfg {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let file_contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Unable to read config file: {}", &e))?;
        let cf: ConfigFile = toml::from_str(&file_contents)
            .map_err(|e| format!("Unable to deserialize config file: {}", &e))?;

        let mut c = Self::default();

        if let Some(p) = cf.storage_path {
            c.storage_path = p;
        }
        if let Some(b) = cf.seed_demo_users {
            c.seed_demo_users = b;
        }

        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ensure_logging;

    use std::io::Write;

    #[test]
    fn defaults() {
        ensure_logging();
        let c = Cfg::default();
        assert_eq!(c.storage_path, PathBuf::from("campus_data.json"));
        assert!(c.seed_demo_users);
    }

    #[test]
    fn partial_file_overlays_defaults() {
        ensure_logging();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "seed_demo_users = false").unwrap();

        let c = Cfg::from_file(f.path()).unwrap();
        assert_eq!(c.storage_path, PathBuf::from("campus_data.json"));
        assert!(!c.seed_demo_users);
    }

    #[test]
    fn full_file_overrides_everything() {
        ensure_logging();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "storage_path = \"/tmp/campus_test.json\"").unwrap();
        writeln!(f, "seed_demo_users = false").unwrap();

        let c = Cfg::from_file(f.path()).unwrap();
        assert_eq!(c.storage_path, PathBuf::from("/tmp/campus_test.json"));
        assert!(!c.seed_demo_users);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        ensure_logging();
        assert!(Cfg::from_file("/no/such/config.toml").is_err());

        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "this is not toml at all [[[").unwrap();
        assert!(Cfg::from_file(f.path()).is_err());
    }
}
