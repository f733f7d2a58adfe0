//! Check system capabilities.

use framecast_capture::permissions::{check_capabilities, print_capability_report};
use framecast_common::config::AppConfig;

pub fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("FrameCast System Check");
    println!("{}", "=".repeat(50));
    println!();
    println!("Endpoint: {}", config.endpoint);
    println!("Capture interval: {} ms", config.interval_ms);
    println!("Camera device: {}", config.capture.device);
    println!();

    let capabilities = check_capabilities(&config.capture.device);
    print_capability_report(&capabilities);

    let all_required_ok = capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available);

    println!();
    if all_required_ok {
        println!("All required capabilities are available. FrameCast is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
        println!("The --test-pattern source works without a camera.");
    }

    Ok(())
}
