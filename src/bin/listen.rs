//! Receive headcast datagrams and print what they carry.
//!
//! Decodes the stream the same way a consumer would, so it doubles as a quick
//! check that packets arrive and the angles look sane.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use headcast::payload::{self, PAYLOAD_BYTES};
use std::net::UdpSocket;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// UDP port
    #[arg(short, long, default_value_t = 5005)]
    port: u16,

    /// Also print every landmark
    #[arg(long)]
    points: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let addr = format!("{}:{}", args.bind, args.port);
    let socket = UdpSocket::bind(&addr).with_context(|| format!("Failed to bind to {}", addr))?;
    println!("{}", format!("Listening on {}", addr).green());

    let mut buf = [0u8; 2048];
    loop {
        let (len, from) = socket.recv_from(&mut buf)?;
        if len != PAYLOAD_BYTES {
            log::warn!("{} sent {} bytes, expected {}", from, len, PAYLOAD_BYTES);
        }

        let sample = match payload::decode(&buf[..len]) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Dropping datagram from {}: {}", from, e);
                continue;
            }
        };

        println!(
            "{} pts  yaw {:+.4} ({:+.1} deg)  pitch {:+.4} ({:+.1} deg)",
            sample.points.len(),
            sample.pose.yaw,
            sample.pose.yaw.to_degrees(),
            sample.pose.pitch,
            sample.pose.pitch.to_degrees()
        );
        if args.points {
            for (i, p) in sample.points.iter().enumerate() {
                println!("  [{}] {:.4} {:.4} {:.4}", i, p.x, p.y, p.z);
            }
        }
    }
}
