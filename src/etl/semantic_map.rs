use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::info;
use rkyv::AlignedVec;

use map_creator::data::semantic::{BoundingBox, ProcessedData};
use map_creator::data::OsmData;
use map_creator::errors::{Error, Result};
use map_creator::map::process_osm;

use crate::UserConfig;

use super::{parse_osm, Etl};

pub const ETL_NAME: &str = "semantic_map";

/// Cache file of the processed features. Geometry is projected for one window and scale, so
/// both are part of the name.
pub fn output_file_name(bbox: &BoundingBox, scale: f64) -> String {
    format!(
        "semantic_map-{}-{}_{}_{}_{}.rkyv",
        scale, bbox.ll.lat, bbox.ll.lon, bbox.ur.lat, bbox.ur.lon,
    )
}

pub fn output_path(dir: &Path, bbox: &BoundingBox, scale: f64) -> PathBuf {
    dir.join(output_file_name(bbox, scale))
}

/// Loads and validates a cached feature file.
pub fn read_processed(path: &Path) -> Result<ProcessedData> {
    let mut input_file = File::open(path)?;
    let mut buf_vec: Vec<u8> = Vec::new();
    input_file.read_to_end(&mut buf_vec)?;

    let mut aligned = AlignedVec::with_capacity(buf_vec.len());
    aligned.extend_from_slice(&buf_vec);
    rkyv::from_bytes::<ProcessedData>(&aligned)
        .map_err(|e| Error::Cache(format!("{}: {}", path.display(), e)))
}

pub fn write_processed(path: &Path, data: &ProcessedData) -> Result<()> {
    let bytes = rkyv::to_bytes::<_, 256>(data).map_err(|e| Error::Cache(e.to_string()))?;
    let mut output_file = File::create(path)?;
    output_file.write_all(&bytes)?;
    Ok(())
}

pub struct SemanticMapEtl<'a> {
    user_config: &'a UserConfig,
}

impl<'a> SemanticMapEtl<'a> {
    pub fn new(user_config: &'a UserConfig) -> SemanticMapEtl<'a> {
        SemanticMapEtl { user_config }
    }

    fn output_path(&self, dir: &Path) -> PathBuf {
        output_path(dir, &self.user_config.bounding_box, self.user_config.scale)
    }
}

impl Etl for SemanticMapEtl<'_> {
    type Input = OsmData;
    type Output = ProcessedData;

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

    fn refresh(&self) -> bool {
        self.user_config.reprocess
    }

    fn extract(&mut self, _dir: &Path) -> Result<Self::Input> {
        parse_osm::read_osm_file(Path::new(&self.user_config.data_path))
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        process_osm(&input, &self.user_config.bounding_box, self.user_config.scale)
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let path = self.output_path(dir);
        write_processed(&path, &output)?;
        info!(path:% = path.display(), features = output.features.len(); "Cached processed features");
        Ok(())
    }
}
