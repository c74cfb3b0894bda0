use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use map_creator::data::semantic::ProcessedData;
use map_creator::errors::Result;
use map_creator::map::style::StyleConfig;
use map_creator::map::{render_map, MapSource};

use crate::UserConfig;

use super::{semantic_map, Etl};

pub const ETL_NAME: &str = "draw_map";

pub fn output_file_name(scale: f64) -> String {
    format!("map-{}.svg", scale)
}

pub struct DrawMapEtl<'a> {
    user_config: &'a UserConfig,
    style: &'a StyleConfig,
}

impl<'a> DrawMapEtl<'a> {
    pub fn new(user_config: &'a UserConfig, style: &'a StyleConfig) -> DrawMapEtl<'a> {
        DrawMapEtl { user_config, style }
    }

    fn output_path(&self, dir: &Path) -> PathBuf {
        dir.join(output_file_name(self.user_config.scale))
    }
}

impl Etl for DrawMapEtl<'_> {
    type Input = ProcessedData;
    type Output = String;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(self.output_path(dir).exists())
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        fs::remove_file(self.output_path(dir))?;
        Ok(())
    }

    /// The style may have changed since the last run, so the map is always redrawn.
    fn refresh(&self) -> bool {
        true
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input> {
        let config = self.user_config;
        semantic_map::read_processed(&semantic_map::output_path(dir, &config.bounding_box, config.scale))
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let rendered = render_map(
            MapSource::Processed(input),
            &self.user_config.bounding_box,
            self.user_config.scale,
            self.style,
        )?;
        info!(width_cm = rendered.page.width, height_cm = rendered.page.height; "Rendered map");
        Ok(rendered.svg)
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let path = self.output_path(dir);
        fs::write(&path, output.as_bytes())?;
        info!(path:% = path.display(), bytes = output.len(); "Wrote map");
        Ok(())
    }
}
