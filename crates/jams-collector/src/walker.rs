//! Concurrent folder tree discovery.
//!
//! Each child folder is walked in its own task; a parent only returns once
//! all of its children's tasks have been joined. A failing node drops its own
//! subtree and nothing else.
//!
//! Folders reachable through several parents are reported once per path.
//! Each task carries the chain of its ancestors, and a child that already
//! appears in that chain is reported but not descended into, so a cyclic
//! hierarchy still terminates.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use jams_api::{ApiResult, Folder, FolderId};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::context::{Branch, ScrapeContext};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Immutable, shared chain of folder IDs from the walk's start to a node.
#[derive(Debug)]
struct Ancestry {
    id: FolderId,
    parent: Option<Arc<Ancestry>>,
}

impl Ancestry {
    fn root(id: FolderId) -> Arc<Self> {
        Arc::new(Self { id, parent: None })
    }

    fn child(self: &Arc<Self>, id: FolderId) -> Arc<Self> {
        Arc::new(Self {
            id,
            parent: Some(Arc::clone(self)),
        })
    }

    fn contains(&self, id: FolderId) -> bool {
        let mut node = Some(self);
        while let Some(n) = node {
            if n.id == id {
                return true;
            }
            node = n.parent.as_deref();
        }
        false
    }
}

/// Discover every folder below `start`.
///
/// Returns the direct children of `start` plus everything found
/// transitively; `start` itself is not included. Only a failure listing
/// `start`'s own children is returned as an error.
pub async fn walk(ctx: &Arc<ScrapeContext>, start: FolderId) -> ApiResult<Vec<Folder>> {
    let children = ctx.subfolders(start).await?;
    let folders = descend(Arc::clone(ctx), children, Ancestry::root(start)).await;
    debug!(start, found = folders.len(), "folder walk complete");
    Ok(folders)
}

/// Walk every child concurrently and append what they find to `children`.
fn descend(
    ctx: Arc<ScrapeContext>,
    children: Vec<Folder>,
    path: Arc<Ancestry>,
) -> BoxFuture<Vec<Folder>> {
    Box::pin(async move {
        let mut tasks = JoinSet::new();
        for child in &children {
            if path.contains(child.id) {
                warn!(folder_id = child.id, parent_id = path.id, "folder cycle detected, not descending");
                continue;
            }
            let ctx = Arc::clone(&ctx);
            let path = path.child(child.id);
            tasks.spawn(subtree(ctx, path));
        }

        let mut found = children;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(sub) => found.extend(sub),
                Err(e) => error!(error = %e, "folder walk task failed"),
            }
        }
        found
    })
}

/// Everything below the folder at the head of `path`; empty on failure.
async fn subtree(ctx: Arc<ScrapeContext>, path: Arc<Ancestry>) -> Vec<Folder> {
    let id = path.id;
    match ctx.subfolders(id).await {
        Ok(children) if children.is_empty() => Vec::new(),
        Ok(children) => descend(ctx, children, path).await,
        Err(e) => {
            ctx.record_failure(Branch::Subfolders(id), &e);
            Vec::new()
        }
    }
}
