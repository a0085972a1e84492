//! INI file configuration adapter.
//!
//! Section and key names are case-sensitive so experiment names keep their case.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new_cs();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new_cs();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn sections(&self) -> Vec<String> {
        let mut sections = self.config.sections();
        sections.sort();
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[engine]
default_variant = control

[storage]
backend = sqlite
path = /var/lib/abtest/abtest.db
pool_size = 2

[collector]
url = https://collector.example.com
timeout_secs = 5

[experiment.checkout_button]
variants = A,B
weights = 0.2,0.8
"#;

    #[test]
    fn from_string_parses_config() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("storage", "path"),
            Some("/var/lib/abtest/abtest.db".to_string())
        );
        assert_eq!(
            adapter.get_string("experiment.checkout_button", "weights"),
            Some("0.2,0.8".to_string())
        );
    }

    #[test]
    fn keys_and_sections_are_case_sensitive() {
        let adapter =
            FileConfigAdapter::from_string("[experiment.HeroBanner]\nvariants = A,B\n").unwrap();
        assert!(adapter.get_string("experiment.HeroBanner", "variants").is_some());
        assert!(adapter.get_string("experiment.herobanner", "variants").is_none());
        assert!(adapter.get_string("experiment.HeroBanner", "Variants").is_none());
    }

    #[test]
    fn sections_are_sorted() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.sections(),
            vec!["collector", "engine", "experiment.checkout_button", "storage"]
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("storage", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("storage", "pool_size", 4), 2);
        assert_eq!(adapter.get_int("storage", "missing", 4), 4);
        assert_eq!(adapter.get_int("storage", "backend", 4), 4);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("engine", "default_variant"),
            Some("control".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/abtest.ini");
        assert!(result.is_err());
    }
}
