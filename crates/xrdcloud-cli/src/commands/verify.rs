use super::GlobalOptions;
use crate::cli::VerifyArgs;
use crate::config::{Overrides, build_config};
use crate::error::Result;
use tracing::info;
use xrdcloud::core::io::dataset::{PointCloudDataset, TargetNormalizer, TargetSelector};

pub fn run(args: VerifyArgs, global: &GlobalOptions) -> Result<()> {
    let config = build_config(&Overrides {
        output_root: args.output.output,
        points: args.points,
        ..global.overrides()
    })?;
    let points = config.pipeline.encoder.point_budget;

    let first_target = config
        .pipeline
        .catalog
        .target_columns
        .first()
        .cloned()
        .unwrap_or_else(|| TargetSelector::BAND_GAP.to_string());
    let dataset =
        PointCloudDataset::open(&config.output_root, TargetSelector::Property(first_target.clone()))?;
    info!("Verifying {} materials under {:?}", dataset.len(), &config.output_root);

    let checked = dataset.verify(points)?;
    println!("{} materials verified ({} points each).", checked, points);

    let targets = dataset.targets()?;
    if let Some(normalizer) = TargetNormalizer::fit(&targets) {
        println!(
            "{}: mean {:.4}, std {:.4}",
            first_target, normalizer.mean, normalizer.std
        );
    }
    Ok(())
}
