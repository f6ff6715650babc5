use serde::Serialize;

use crate::store::Store;
use crate::types::GalleryStats;

use super::init_store;

#[derive(Serialize)]
struct ServerInfo {
    #[serde(flatten)]
    stats: GalleryStats,
    admins: usize,
}

pub fn run_info(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let stats = store.gallery_stats()?;
    let admins = store
        .list_users()?
        .iter()
        .filter(|u| u.is_admin())
        .count();

    let info = ServerInfo { stats, admins };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let stats = &info.stats;
    println!();
    println!("Solarhub Server Status");
    println!("{}", "─".repeat(22));
    println!(
        "Photos:       {} ({} featured)",
        stats.total_photos, stats.featured_photos
    );
    println!("Downloads:    {}", stats.total_downloads);
    println!("Tags:         {}", stats.total_tags);
    println!(
        "Collections:  {} ({} published, {} views)",
        stats.total_collections, stats.published_collections, stats.total_views
    );
    println!("Users:        {} ({} admin)", stats.total_users, info.admins);
    println!();

    Ok(())
}
