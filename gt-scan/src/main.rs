use clap::Parser;
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use gt_scan::cli::ScanArgs;

fn main() {
    let start = std::time::Instant::now();
    init_with_level(Level::Info).unwrap();

    let args: ScanArgs = ScanArgs::parse();

    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let path = gt_scan::scan(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    info!("SUCCESS: snapshot written to {}", path.display());

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
