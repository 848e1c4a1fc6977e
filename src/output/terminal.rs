// Colored terminal output for threads and pipeline results.
//
// This module handles all terminal-specific formatting: colors, layout,
// summaries. The main.rs display functions delegate here.

use colored::Colorize;

use crate::output::truncate_chars;
use crate::pipeline::fetch::FetchRunResult;
use crate::pipeline::translate::TranslateRunResult;
use crate::threads::Thread;

/// Display reconstructed threads in the terminal, newest root first.
pub fn display_threads(username: &str, threads: &[Thread]) {
    if threads.is_empty() {
        println!("No stored posts for @{username}. Run `magpie fetch` first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== @{username} ({} threads) ===", threads.len()).bold()
    );

    for thread in threads {
        println!();
        println!(
            "  {} {}",
            thread.root.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            format!(
                "♥ {}  ⇄ {}  👁 {}",
                thread.metrics.likes, thread.metrics.reposts, thread.metrics.views
            )
            .dimmed(),
        );
        println!("  {}", truncate_chars(&thread.root.text, 120));
        if let Some(translated) = &thread.root.translated_text {
            println!("  {}", truncate_chars(translated, 120).cyan());
        }

        for reply in &thread.replies {
            println!("    ↳ {}", truncate_chars(&reply.text, 110));
            if let Some(translated) = &reply.translated_text {
                println!("      {}", truncate_chars(translated, 110).cyan());
            }
        }

        if let Some(comment) = &thread.root.comment_text {
            if !comment.is_empty() {
                println!("  {} {}", "锐评:".yellow(), truncate_chars(comment, 110));
            }
        }
    }

    println!();
}

/// Summarize a completed fetch run.
pub fn display_fetch_result(result: &FetchRunResult) {
    println!();
    println!(
        "{} {} accounts, {} new posts, {} outside retention",
        "Fetch complete:".bold(),
        result.fetched_accounts,
        result.new_posts,
        result.skipped_old,
    );
    if result.purged_expired + result.purged_orphans > 0 {
        println!(
            "  purged {} expired, {} orphaned",
            result.purged_expired, result.purged_orphans
        );
    }
    for error in &result.errors {
        println!("  {} {}", "!".red().bold(), error);
    }
}

/// Summarize a completed translation run.
pub fn display_translate_result(result: &TranslateRunResult) {
    println!();
    if result.aborted {
        println!(
            "{} {} of {} posts before cancellation",
            "Translation aborted:".yellow().bold(),
            result.translated.len(),
            result.attempted,
        );
    } else {
        println!(
            "{} {} translated, {} failed",
            "Translation complete:".bold(),
            result.translated.len(),
            result.errors.len(),
        );
    }
    for failure in &result.errors {
        println!(
            "  {} post {}: {}",
            "!".red().bold(),
            failure.post_id,
            truncate_chars(&failure.error, 100)
        );
    }
}
