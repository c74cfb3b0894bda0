mod etl;

use std::env;
use std::fs::{self, create_dir_all, File};
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use map_creator::data::semantic::BoundingBox;
use map_creator::errors::Result;
use map_creator::map::style::StyleConfig;

use crate::etl::draw_map::DrawMapEtl;
use crate::etl::semantic_map::SemanticMapEtl;
use crate::etl::Etl;

const DEFAULT_CONFIG_PATH: &str = "config/map.json";

#[derive(Deserialize)]
pub struct UserConfig {
    /// OSM XML or Overpass JSON file, optionally `.xz` compressed.
    pub data_path: String,
    /// Style sheet and shapes. The built-in style is used unless both are given.
    #[serde(default)]
    pub style_path: Option<String>,
    #[serde(default)]
    pub shapes_path: Option<String>,
    pub bounding_box: BoundingBox,
    /// Scale denominator, i.e. 25000 for 1:25000.
    pub scale: f64,
    /// Rebuild the processed features even if a cached copy exists.
    #[serde(default)]
    pub reprocess: bool,
}

fn load_user_config(path: &str) -> Result<UserConfig> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

fn load_style(config: &UserConfig) -> Result<StyleConfig> {
    match (&config.style_path, &config.shapes_path) {
        (Some(style_path), Some(shapes_path)) => {
            info!(style = style_path.as_str(), shapes = shapes_path.as_str(); "Loading style");
            StyleConfig::from_json(&fs::read_to_string(style_path)?, &fs::read_to_string(shapes_path)?)
        },
        _ => StyleConfig::builtin(),
    }
}

fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let input_fname = Path::new(&config.data_path)
        .file_name()
        .ok_or("Could not get input file name")?;
    let output_dir = Path::new("output").join(input_fname);
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging() {
    Builder::with_level("info")
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn main() -> Result<()> {
    setup_logging();

    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let user_config = load_user_config(&config_path)?;
    let style = load_style(&user_config)?;
    let output_dir = create_output_dir(&user_config)?;

    SemanticMapEtl::new(&user_config).process(&output_dir)?;
    DrawMapEtl::new(&user_config, &style).process(&output_dir)?;

    Ok(())
}
