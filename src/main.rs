use clap::Parser;
use colored::*;

use headcast::args::Args;
use headcast::camera::CameraSource;
use headcast::config::AppConfig;
use headcast::inference::FaceMeshExtractor;
use headcast::pipeline::Pipeline;
use headcast::transport::UdpTransport;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // 0. Load Config
    let mut config = AppConfig::load(&args.config)?;
    config.apply_args(&args);

    // 1. Setup Transport (destination resolved once, here)
    let transport = UdpTransport::connect(&config.transport.host, config.transport.port)?;
    println!("{}", format!("Streaming to {}", transport.dest()).green());

    // 2. Setup Camera
    let camera = CameraSource::new(config.capture.cam_index)?;

    // 3. Setup Inference
    let extractor = FaceMeshExtractor::new(&config.extractor)?;

    // 4. Loop until the camera stops delivering
    let pipeline = Pipeline::new(camera, extractor, transport, config.transport.max_send_failures);
    let summary = pipeline.run()?;

    log::info!(
        "Stopped after {} frames: {} faces, {} datagrams sent, {} send failures",
        summary.frames,
        summary.faces,
        summary.sent,
        summary.send_failures
    );
    Ok(())
}
