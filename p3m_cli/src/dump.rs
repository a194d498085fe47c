use std::path::PathBuf;

use clap::Parser;

use p3m::{read_file, DecodeSettings, Result};

/// Decode a file and print the resulting scene.
#[derive(Parser)]
pub struct Dump {
    path: PathBuf,
    #[clap(short, long)]
    bones: bool,
    #[clap(short, long)]
    vertices: bool,
    #[clap(long)]
    hide_unused: bool,
    #[clap(long, default_value_t = 0.05)]
    stub_length: f32,
}

pub fn dump(opts: &Dump) -> Result<()> {
    let mut settings = DecodeSettings::new();
    settings.hide_unused_bones(opts.hide_unused);
    settings.stub_length(opts.stub_length);

    let scene = read_file(&opts.path, &settings)?;
    let topology = scene.topology();

    println!(
        "{} bones, {} vertices, {} faces ({} skipped)",
        scene.bones.len(),
        scene.vertices.len(),
        topology.faces.len(),
        topology.rejected.len()
    );

    if opts.bones {
        for bone in &scene.bones {
            println!("{:#?}", bone);
        }
    }

    if opts.vertices {
        for (i, vertex) in scene.vertices.iter().enumerate() {
            println!("{:>5}: {:?}", i, vertex);
        }
    }

    for rejected in &topology.rejected {
        println!("skipped: {}", rejected);
    }

    Ok(())
}
