//! Report generation port trait.

use crate::domain::error::AbTestError;
use crate::domain::report::ExperimentReport;
use std::fs;
use std::path::Path;

/// Port for rendering experiment results.
pub trait ReportPort {
    fn render(&self, reports: &[ExperimentReport]) -> Result<String, AbTestError>;

    /// Default implementation: renders and writes to `output_path`, creating
    /// parent directories as needed.
    fn write(&self, reports: &[ExperimentReport], output_path: &str) -> Result<(), AbTestError> {
        let rendered = self.render(reports)?;
        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, rendered)?;
        Ok(())
    }
}
