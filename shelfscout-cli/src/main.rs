use clap::Parser;
use shelfscout::io::save_mask_png;
use shelfscout::{
    Center, CenterConfig, Heatmap, InstanceConfig, ModelOutputs, OffsetField, PostProcessConfig,
    PostProcessor, ProbabilityMap, RegionConfig, ShelfSummary,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "ShelfScout post-processing CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CenterConfigJson {
    prob_thresh: f32,
    nms_kernel: usize,
    top_k: usize,
}

impl Default for CenterConfigJson {
    fn default() -> Self {
        let cfg = CenterConfig::default();
        Self {
            prob_thresh: cfg.prob_thresh,
            nms_kernel: cfg.nms_kernel,
            top_k: cfg.top_k,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct InstanceConfigJson {
    sem_thresh: f32,
    max_radius: f32,
    min_pixels: usize,
}

impl Default for InstanceConfigJson {
    fn default() -> Self {
        let cfg = InstanceConfig::default();
        Self {
            sem_thresh: cfg.sem_thresh,
            max_radius: cfg.max_radius,
            min_pixels: cfg.min_pixels,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RegionConfigJson {
    sem_thresh: f32,
    margin: usize,
}

impl Default for RegionConfigJson {
    fn default() -> Self {
        let cfg = RegionConfig::default();
        Self {
            sem_thresh: cfg.sem_thresh,
            margin: cfg.margin,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    outputs_path: String,
    output_path: Option<String>,
    mask_dir: Option<String>,
    image_size: u32,
    stride: usize,
    parallel: bool,
    centers: CenterConfigJson,
    instances: InstanceConfigJson,
    regions: RegionConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            outputs_path: String::new(),
            output_path: None,
            mask_dir: None,
            image_size: 512,
            stride: PostProcessConfig::default().stride,
            parallel: false,
            centers: CenterConfigJson::default(),
            instances: InstanceConfigJson::default(),
            regions: RegionConfigJson::default(),
        }
    }
}

impl Config {
    fn post_process_config(&self) -> PostProcessConfig {
        PostProcessConfig {
            stride: self.stride,
            centers: CenterConfig {
                prob_thresh: self.centers.prob_thresh,
                nms_kernel: self.centers.nms_kernel,
                top_k: self.centers.top_k,
                parallel: self.parallel,
            },
            instances: InstanceConfig {
                sem_thresh: self.instances.sem_thresh,
                max_radius: self.instances.max_radius,
                min_pixels: self.instances.min_pixels,
                parallel: self.parallel,
            },
            regions: RegionConfig {
                sem_thresh: self.regions.sem_thresh,
                margin: self.regions.margin,
            },
        }
    }
}

/// Raw model outputs for one image, channel-first and row-major.
#[derive(Debug, Deserialize)]
struct ModelOutputsJson {
    width: usize,
    height: usize,
    #[serde(default)]
    semantic_prob: Option<Vec<f32>>,
    #[serde(default)]
    semantic_logits: Option<Vec<f32>>,
    #[serde(default = "default_foreground_class")]
    foreground_class: usize,
    center_logits: Vec<f32>,
    offsets: Vec<f32>,
}

fn default_foreground_class() -> usize {
    1
}

impl ModelOutputsJson {
    fn into_outputs(self) -> Result<ModelOutputs, Box<dyn std::error::Error>> {
        let (width, height) = (self.width, self.height);
        let semantic = match (self.semantic_prob, self.semantic_logits) {
            (Some(prob), None) => ProbabilityMap::new(prob, width, height)?,
            (None, Some(logits)) => {
                let plane = width * height;
                if plane == 0 || logits.len() % plane != 0 {
                    return Err("semantic_logits length must be a multiple of width*height".into());
                }
                ProbabilityMap::from_class_logits(
                    &logits,
                    logits.len() / plane,
                    self.foreground_class,
                    width,
                    height,
                )?
            }
            _ => return Err("exactly one of semantic_prob or semantic_logits must be set".into()),
        };
        let centers = Heatmap::new(self.center_logits, width, height)?;
        let offsets = OffsetField::from_planar(&self.offsets, width, height)?;
        Ok(ModelOutputs::new(semantic, centers, offsets)?)
    }
}

#[derive(Debug, Serialize)]
struct CenterRecord {
    x: f32,
    y: f32,
    score: f32,
}

impl From<Center> for CenterRecord {
    fn from(value: Center) -> Self {
        Self {
            x: value.x,
            y: value.y,
            score: value.score,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    empty_ratio: f32,
    decoded_centers: usize,
    predicted_instances: usize,
    product_pixels: usize,
    empty_pixels: usize,
    feature_map_size: [usize; 2],
    image_size: u32,
    shelf_bbox: Option<[usize; 4]>,
    centers: Vec<CenterRecord>,
}

impl Output {
    fn new(summary: ShelfSummary, image_size: u32, centers: Vec<Center>) -> Self {
        Self {
            empty_ratio: summary.empty_ratio,
            decoded_centers: summary.decoded_centers,
            predicted_instances: summary.predicted_instances,
            product_pixels: summary.product_pixels,
            empty_pixels: summary.empty_pixels,
            feature_map_size: summary.feature_map_size,
            image_size,
            shelf_bbox: summary.shelf_bbox.map(|b| b.to_array()),
            centers: centers.into_iter().map(CenterRecord::from).collect(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("shelfscout=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.outputs_path.is_empty() {
        return Err("outputs_path must be set in the config".into());
    }

    let processor = PostProcessor::new(config.post_process_config())?;
    let outputs_text = fs::read_to_string(&config.outputs_path)?;
    let outputs = serde_json::from_str::<ModelOutputsJson>(&outputs_text)?.into_outputs()?;
    let (width, height) = outputs.shape();
    tracing::info!(width, height, stride = config.stride, "model outputs loaded");

    let report = processor.process(&outputs)?;

    if let Some(dir) = &config.mask_dir {
        let dir = Path::new(dir);
        fs::create_dir_all(dir)?;
        let regions = &report.regions;
        save_mask_png(&regions.product, config.image_size, dir.join("product_mask.png"))?;
        save_mask_png(&regions.empty, config.image_size, dir.join("empty_mask.png"))?;
        save_mask_png(
            &regions.background,
            config.image_size,
            dir.join("background_mask.png"),
        )?;
        tracing::info!(dir = %dir.display(), "masks written");
    }

    let output = Output::new(report.summary(), config.image_size, report.centers);
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
