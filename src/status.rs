// System status display — DB stats, backlog size, recent run history.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::db::PostStore;

/// Display system status to the terminal.
pub async fn show(store: &Arc<dyn PostStore>, owner_id: i64, db_display_path: &str) -> Result<()> {
    if !Path::new(db_display_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `magpie init` to set up the database.");
        return Ok(());
    }

    let file_size = std::fs::metadata(db_display_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_display_path, file_size);

    let accounts = store.list_tracked_accounts(owner_id).await?;
    if accounts.is_empty() {
        println!("Tracked accounts: none");
        println!("  Run `magpie track <username>` to add one");
    } else {
        println!("Tracked accounts: {}", accounts.len());
        for account in &accounts {
            println!(
                "  @{} (retention {}d)",
                account.username, account.retention_days
            );
        }
    }

    let posts = store.posts_for_owner(owner_id).await?;
    let backlog = store.count_untranslated(owner_id).await?;
    println!("Stored posts: {} ({} untranslated)", posts.len(), backlog);

    match store.recent_fetch_logs(owner_id, 1).await?.first() {
        Some(log) => {
            println!(
                "Last fetch: {} ({} accounts, {} new, {} skipped, {} errors)",
                log.created_at,
                log.fetched_accounts,
                log.new_posts,
                log.skipped_old,
                log.errors.len(),
            );
        }
        None => println!("Last fetch: never"),
    }

    match store.recent_translate_logs(owner_id, 1).await?.first() {
        Some(log) => {
            println!(
                "Last translation: {} ({}/{} translated{})",
                log.created_at,
                log.translated,
                log.attempted,
                if log.aborted { ", aborted" } else { "" },
            );
        }
        None => println!("Last translation: never"),
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
