//! `ddm info <url>` – probe a URL and print what the server reports.

use anyhow::Result;
use ddm_core::config::DdmConfig;
use ddm_core::Coordinator;

pub async fn run_info(cfg: DdmConfig, url: &str) -> Result<()> {
    let coordinator = Coordinator::new(cfg);
    let metadata = coordinator.info(url).await?;

    println!("filename:      {}", metadata.filename);
    println!("size:          {} bytes", metadata.size);
    println!("content-type:  {}", metadata.content_type);
    println!("resumable:     {}", metadata.supports_range);
    if let Some(etag) = &metadata.etag {
        println!("etag:          {etag}");
    }
    if let Some(last_modified) = &metadata.last_modified {
        println!("last-modified: {last_modified}");
    }

    Ok(())
}
