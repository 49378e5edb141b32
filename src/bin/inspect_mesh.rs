use anyhow::Result;
use headcast::inference::{MESH_LANDMARKS, REFINED_LANDMARKS};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::ValueType;
use std::env;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: inspect-mesh <path_to_model.onnx>");
        return Ok(());
    }

    let model_path = &args[1];
    println!("Inspecting model: {}", model_path);

    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level1)?
        .with_intra_threads(1)?
        .commit_from_file(model_path)?;

    println!("\n--- Inputs ---");
    for (i, input) in session.inputs.iter().enumerate() {
        println!("#{}: Name: {}", i, input.name);
        println!("    Type: {:?}", input.input_type);
    }

    println!("\n--- Outputs ---");
    let mut widest = 0usize;
    for (i, output) in session.outputs.iter().enumerate() {
        println!("#{}: Name: {}", i, output.name);
        println!("    Type: {:?}", output.output_type);
        if let ValueType::Tensor { shape, .. } = &output.output_type {
            // Dynamic dims are negative; skip those outputs
            if shape.iter().all(|&d| d > 0) {
                widest = widest.max(shape.iter().product::<i64>() as usize);
            }
        }
    }

    println!("\n--- Landmarks ---");
    println!("Widest static output: {} values", widest);
    println!("Plain mesh ({} pts): {}", MESH_LANDMARKS, verdict(widest >= MESH_LANDMARKS * 3));
    println!("Refined mesh ({} pts): {}", REFINED_LANDMARKS, verdict(widest >= REFINED_LANDMARKS * 3));

    Ok(())
}

fn verdict(ok: bool) -> &'static str {
    if ok {
        "supported"
    } else {
        "not supported"
    }
}
