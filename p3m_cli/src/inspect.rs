use std::path::PathBuf;

use clap::Parser;

use p3m::{P3m, Result};

/// Print the header counts and raw bone records of a file.
#[derive(Parser)]
pub struct Inspect {
    path: PathBuf,
}

pub fn inspect(opts: &Inspect) -> Result<()> {
    let file = P3m::read(&opts.path)?;

    println!("{}: {} bytes", opts.path.display(), file.byte_len());
    println!(
        "  {} position bones, {} angle bones, {} vertices, {} faces",
        file.position_bones().len(),
        file.angle_bones().len(),
        file.vertices().len(),
        file.triangles().len()
    );

    let reserved_used = file.reserved().iter().filter(|&&b| b != 0).count();
    if reserved_used > 0 {
        println!("  reserved block: {} non-zero bytes", reserved_used);
    }

    for (i, bone) in file.position_bones().iter().enumerate() {
        println!(
            "position {:>3}: {:?} -> angle {:?}",
            i, bone.position, bone.child_angle_indices
        );
    }
    for (i, bone) in file.angle_bones().iter().enumerate() {
        println!(
            "angle    {:>3}: {:?} x{} -> position {:?}",
            i, bone.local_vector, bone.scale, bone.child_position_indices
        );
    }

    Ok(())
}
