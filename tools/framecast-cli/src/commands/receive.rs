//! Receive frames and write them to disk.

use std::path::{Path, PathBuf};

use framecast_transport::FrameSink;

pub async fn run(listen: String, output: PathBuf) -> anyhow::Result<()> {
    std::fs::create_dir_all(&output)?;

    let mut sink = FrameSink::bind(listen.as_str()).await?;
    println!("Listening on ws://{}", sink.local_addr());
    println!("Writing frames to {}", output.display());
    println!("Press Ctrl+C to stop...");
    println!();

    // Numbering continues after files from earlier runs
    let mut frame_number = existing_frame_count(&output);
    let mut saved = 0u64;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            received = sink.recv() => {
                let envelope = received?;
                match envelope.payload() {
                    Ok(bytes) => {
                        let path = output.join(format!("frame_{frame_number}.jpg"));
                        if let Err(e) = tokio::fs::write(&path, &bytes).await {
                            tracing::warn!(error = %e, path = %path.display(), "Failed to write frame");
                            continue;
                        }
                        println!(
                            "Saved {} ({} bytes, captured at {})",
                            path.display(),
                            bytes.len(),
                            envelope.timestamp
                        );
                        frame_number += 1;
                        saved += 1;
                    }
                    Err(e) => tracing::warn!(error = %e, "Bad frame payload"),
                }
            }
        }
    }

    println!();
    println!("Received {saved} frames");
    Ok(())
}

fn existing_frame_count(dir: &Path) -> u64 {
    std::fs::read_dir(dir)
        .map(|entries| entries.count() as u64)
        .unwrap_or(0)
}
