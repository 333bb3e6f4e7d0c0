//! Quick benchmark to verify template expansion performance

use ams_migrate::sanitize::sanitize_resource_name;
use ams_migrate::{Asset, Manifest, TemplateMapper};
use std::time::Instant;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mapper = TemplateMapper::new();
    let manifest = Manifest::default();
    let asset = Asset::new("Quarterly Review (Final).mp4")
        .with_container("asset-5f1c2a9e")
        .with_alternate_id("EXT_2024_Q3");

    // Test templates of varying complexity
    let templates = vec![
        "static-container",
        "${ContainerName}",
        "${AssetName}/${ContainerName}",
        "${ContainerName}/${AlternateId}/${AssetId}/${AssetName}",
    ];

    println!("Template Expansion Performance Test");
    println!("===================================\n");

    for template in &templates {
        let iterations = 100_000;
        let start = Instant::now();

        for _ in 0..iterations {
            let _ = mapper
                .expand_asset_template(&asset, &manifest, template)
                .await;
        }

        let elapsed = start.elapsed();
        let per_op = elapsed / iterations;

        println!("Template: {:60}", format!("\"{}\"", template));
        println!("  Time for {} iterations: {:?}", iterations, elapsed);
        println!("  Per operation: {:?}\n", per_op);
    }

    println!("Sanitizer Performance");
    println!("=====================\n");

    let long_name = "Some_Very.Long:Name (copy) ".repeat(8);
    let inputs = vec!["short", "My Video (1).mp4", long_name.as_str()];
    let iterations = 1_000_000;

    for input in &inputs {
        let start = Instant::now();
        for _ in 0..iterations {
            let _ = sanitize_resource_name(input);
        }
        let elapsed = start.elapsed();
        println!("Input length {:3}: {:?} per op", input.len(), elapsed / iterations);
    }
}
