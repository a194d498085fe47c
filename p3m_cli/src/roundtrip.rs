use std::path::PathBuf;

use clap::Parser;
use tracing::debug;

use p3m::{decode, encode, P3m, Result};

/// Decode and re-encode a file, checking that the bone arrays survive unchanged.
#[derive(Parser)]
pub struct Roundtrip {
    path: PathBuf,
    /// Write the re-encoded file here.
    #[clap(short, long)]
    output: Option<PathBuf>,
}

pub fn roundtrip(opts: &Roundtrip) -> Result<()> {
    let original = P3m::read(&opts.path)?;
    let encoded = encode(&decode(&original.to_bytes())?)?;
    let reencoded = P3m::parse(&encoded)?;
    debug!(
        "re-encoded {} bytes into {} bytes",
        original.byte_len(),
        encoded.len()
    );

    let position_bones = original.position_bones() == reencoded.position_bones();
    let angle_bones = original.angle_bones() == reencoded.angle_bones();

    println!(
        "position bones {}, angle bones {}",
        verdict(position_bones),
        verdict(angle_bones)
    );
    if position_bones && angle_bones && original.to_bytes() == encoded {
        println!("file is a fixed point");
    }

    if let Some(output) = &opts.output {
        reencoded.write(output)?;
        println!("wrote {}", output.display());
    }

    Ok(())
}

fn verdict(unchanged: bool) -> &'static str {
    if unchanged {
        "unchanged"
    } else {
        "changed"
    }
}
