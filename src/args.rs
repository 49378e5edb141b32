use clap::Parser;
use std::path::PathBuf;

/// Stream head pose and face landmarks from a webcam over UDP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (created with defaults if missing)
    #[arg(long, default_value = "headcast.json")]
    pub config: PathBuf,

    /// Camera index
    #[arg(short, long)]
    pub cam_index: Option<u32>,

    /// Destination host
    #[arg(long)]
    pub host: Option<String>,

    /// Destination UDP port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Use the plain 468-point mesh instead of the refined 478-point set
    #[arg(long)]
    pub no_refine: bool,

    /// Face mesh ONNX model
    #[arg(long)]
    pub mesh_model: Option<String>,

    /// Face detector ONNX model
    #[arg(long)]
    pub detector_model: Option<String>,

    /// Consecutive send failures before exiting (0 = never)
    #[arg(long)]
    pub max_send_failures: Option<u32>,
}
