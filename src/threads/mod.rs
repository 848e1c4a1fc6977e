// Thread reconstruction — merging a flat post collection into ordered
// self-reply threads.
//
// Pure functions over plain structs: no I/O, no storage. A thread is a
// derived view, rebuilt on every read, never persisted.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use serde::Serialize;

use crate::db::models::Post;

/// Separator used when joining a thread's texts into one block.
pub const THREAD_SEPARATOR: &str = "\n\n---\n\n";

/// Per-field sums of the engagement counters across a thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngagementTotals {
    pub likes: i64,
    pub reposts: i64,
    pub replies: i64,
    pub quotes: i64,
    pub views: i64,
    pub bookmarks: i64,
}

impl EngagementTotals {
    fn accumulate(&mut self, post: &Post) {
        self.likes += post.like_count;
        self.reposts += post.repost_count;
        self.replies += post.reply_count;
        self.quotes += post.quote_count;
        self.views += post.view_count;
        self.bookmarks += post.bookmark_count;
    }
}

/// A reconstructed chain of self-replies rooted at one original post.
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    /// Id of the earliest post in the chain
    pub root_id: String,
    pub root: Post,
    /// Replies in traversal order (chronological for linear chains)
    pub replies: Vec<Post>,
    pub reply_count: usize,
    /// Root and reply texts joined by THREAD_SEPARATOR
    pub combined_text: String,
    pub metrics: EngagementTotals,
}

/// Build threads from an unordered post collection, newest root first.
///
/// A post is linked under a parent only when its reply_to_id resolves
/// within the collection AND the parent shares the author. Replies to
/// other people's posts become independent roots.
///
/// Reply collection is a stack traversal: the root's direct children are
/// seeded in ascending creation order, the most-recently-discovered node
/// is taken next, and its children go ahead of any still-pending earlier
/// siblings. Linear chains (the overwhelmingly common case) come out in
/// exact chronological order; branching trees are linearized depth-first
/// and sibling branches can interleave non-chronologically.
pub fn build_threads(posts: &[Post]) -> Result<Vec<Thread>> {
    for post in posts {
        if post.id.is_empty() {
            bail!("malformed post: empty id");
        }
        if post.author_username.is_empty() {
            bail!("malformed post {}: empty author", post.id);
        }
    }

    let by_id: HashMap<&str, &Post> = posts.iter().map(|p| (p.id.as_str(), p)).collect();
    if by_id.len() != posts.len() {
        bail!("malformed input: duplicate post ids");
    }

    // Parent edges: child -> parent, only for same-author replies whose
    // parent is present in the collection.
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut children: HashMap<&str, Vec<&Post>> = HashMap::new();
    for post in posts {
        if let Some(reply_to) = post.reply_to_id.as_deref() {
            if let Some(parent_post) = by_id.get(reply_to) {
                if parent_post.author_username == post.author_username {
                    parent.insert(post.id.as_str(), reply_to);
                    children.entry(reply_to).or_default().push(post);
                }
            }
        }
    }
    for list in children.values_mut() {
        list.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut threads = Vec::new();

    for post in posts {
        let root_id = resolve_root(post, &parent, posts.len())?;
        if !visited.insert(root_id) {
            continue;
        }
        let root = by_id[root_id];

        let mut replies: Vec<&Post> = Vec::new();
        let mut stack: Vec<&Post> = children.get(root_id).cloned().unwrap_or_default();
        while let Some(node) = stack.pop() {
            if !visited.insert(node.id.as_str()) {
                continue;
            }
            replies.push(node);
            if let Some(kids) = children.get(node.id.as_str()) {
                stack.extend(kids.iter().copied());
            }
        }

        let mut combined_text = root.text.clone();
        for reply in &replies {
            combined_text.push_str(THREAD_SEPARATOR);
            combined_text.push_str(&reply.text);
        }

        let mut metrics = EngagementTotals::default();
        metrics.accumulate(root);
        for reply in &replies {
            metrics.accumulate(reply);
        }

        threads.push(Thread {
            root_id: root.id.clone(),
            root: root.clone(),
            reply_count: replies.len(),
            replies: replies.into_iter().cloned().collect(),
            combined_text,
            metrics,
        });
    }

    threads.sort_by(|a, b| b.root.created_at.cmp(&a.root.created_at));
    Ok(threads)
}

/// Walk parent edges to a fixed point. A walk longer than the collection
/// means a reply cycle, which real provider data can't produce — treat it
/// as malformed input.
fn resolve_root<'a>(
    post: &'a Post,
    parent: &HashMap<&'a str, &'a str>,
    max_steps: usize,
) -> Result<&'a str> {
    let mut current = post.id.as_str();
    let mut steps = 0;
    while let Some(&up) = parent.get(current) {
        current = up;
        steps += 1;
        if steps > max_steps {
            bail!("malformed input: reply cycle involving post {}", post.id);
        }
    }
    Ok(current)
}
