use anyhow::{bail, Result};

use tracknav::detectors;
use tracknav::multitrack::MultiTrack;
use tracknav::settings;

fn main() -> Result<()> {
    env_logger::init();

    let settings = settings::load_config()?;
    println!("{}", settings);

    let detector = match settings.detector.as_str() {
        "telescope" => {
            let positions: Vec<f64> = (0..11).map(|i| 10.0 * i as f64).collect();
            detectors::telescope(&positions, f64::INFINITY, 0.2)
        }
        "barrel" => detectors::gridded_barrel(30.0, 50.0, 500.0, 16, 8),
        other => bail!("Unknown detector '{other}'"),
    };

    let summary = MultiTrack::new(&detector, settings).solve();
    println!("{}", summary);

    Ok(())
}
