use std::path::PathBuf;

use anyhow::Result;
use centaur_core::config::CentaurConfig;
use centaur_core::io::fits::FitsReader;
use centaur_core::metadata::extract_metadata;
use clap::Args;

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,

    /// Print every header keyword
    #[arg(long)]
    pub header: bool,
}

fn opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn run(args: &InfoArgs, config: &CentaurConfig) -> Result<()> {
    let reader = FitsReader::open(&args.file)?;
    let frame = reader.read_frame()?;
    let meta = extract_metadata(&reader, &frame, &config.analysis)?;
    let info = &meta.info;
    let inst = &meta.instrument;

    println!("File:        {}", info.filename);
    println!("Object:      {}", info.object);
    println!("Filter:      {}", info.filter);
    println!("Dimensions:  {}x{}", info.dimensions.0, info.dimensions.1);
    println!("BITPIX:      {}", reader.layout.bitpix);
    if reader.layout.planes > 1 {
        println!("Planes:      {} (first analyzed)", reader.layout.planes);
    }
    println!("Camera:      {}", info.camera);
    println!("Telescope:   {}", info.telescope);
    println!("Rig:         {}", info.rig);
    println!("Exposure:    {}", opt(inst.exposure));
    println!("Gain:        {}", opt(inst.gain));
    println!("Read noise:  {}", opt(inst.read_noise));
    println!("Pixel scale: {}", opt(inst.pixel_scale));
    println!("Saturation:  {}", inst.saturation_level);
    println!("Zero point:  {}", inst.zero_point);

    if args.header {
        println!();
        for (key, value) in reader.header.iter() {
            println!("{:<8} = {}", key, value.to_text());
        }
    }

    Ok(())
}
