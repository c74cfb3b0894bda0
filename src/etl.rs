pub mod draw_map;
pub mod parse_osm;
pub mod semantic_map;

use std::path::Path;

use log::{error, info};

use map_creator::errors::{Error, Result};

/// One pipeline stage whose output is cached in the output directory.
///
/// A stage whose output already exists is skipped unless [`Etl::refresh`] asks for the
/// cached copy to be dropped and rebuilt.
pub trait Etl {
    type Input;
    type Output;

    fn etl_name(&self) -> &str;

    fn is_cached(&self, dir: &Path) -> Result<bool>;
    fn clean(&self, dir: &Path) -> Result<()>;

    /// Rebuild even if a cached output exists.
    fn refresh(&self) -> bool {
        false
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input>;
    fn transform(&mut self, input: Self::Input) -> Result<Self::Output>;
    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()>;

    fn process(&mut self, dir: &Path) -> Result<()> {
        let etl_name = self.etl_name().to_string();
        info!(etl_name = etl_name.as_str(); "Starting ETL process");

        if self.is_cached(dir)? {
            if !self.refresh() {
                info!(etl_name = etl_name.as_str(); "Using cached value");
                return Ok(());
            }
            info!(etl_name = etl_name.as_str(); "Discarding cached value");
            self.clean(dir)?;
        }

        info!(etl_name = etl_name.as_str(); "Extracting");
        let input = self.extract(dir)
            .inspect_err(|err| log_failure(&etl_name, "Extraction", err))?;

        info!(etl_name = etl_name.as_str(); "Transforming");
        let output = self.transform(input)
            .inspect_err(|err| log_failure(&etl_name, "Transformation", err))?;

        info!(etl_name = etl_name.as_str(); "Loading");
        self.load(dir, output)
            .inspect_err(|err| log_failure(&etl_name, "Loading", err))?;

        info!(etl_name = etl_name.as_str(); "Process finished");
        Ok(())
    }
}

fn log_failure(etl_name: &str, step: &str, err: &Error) {
    error!(etl_name = etl_name, step = step, err:% = err; "ETL step failed");
}
