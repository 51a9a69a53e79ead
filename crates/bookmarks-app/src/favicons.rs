use std::collections::{BTreeMap, BTreeSet};

use bookmarks_favicon::{resize_to_width, Content};
use bookmarks_shared::constants::{
    DEFAULT_FAVICON_MODIFIED, DEFAULT_FAVICON_NAME, DEFAULT_FILE_ICON, DEFAULT_FOLDER_ICON,
    DEFAULT_NODE_ICON, FAVICON_WIDTH,
};
use bookmarks_shared::hashing::{content_address, sha1_hex};
use bookmarks_shared::types::User;
use bookmarks_shared::{BookmarkError, Result};
use bookmarks_store::{Bookmark, NodeType};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::bookmarks::Application;
use crate::error::BlobError;
use crate::models::{mime_for, FileInfo};

impl Application {
    /// Run a blocking use case on the blocking thread pool.
    pub async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Application) -> Result<T> + Send + 'static,
    {
        let app = self.clone();
        tokio::task::spawn_blocking(move || f(&app))
            .await
            .map_err(|e| BookmarkError::Internal(e.to_string()))?
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Favicon of a bookmark, or the built-in icon for its type.
    pub async fn get_favicon(&self, id: &str, user: &User) -> Result<FileInfo> {
        if id.is_empty() {
            return Err(BookmarkError::validation("missing bookmark id parameter"));
        }
        let (bookmark_id, owner) = (id.to_string(), user.clone());
        let bookmark = self
            .run_blocking(move |app| app.get_bookmark_by_id(&bookmark_id, &owner))
            .await?;

        if bookmark.favicon.is_empty() {
            return Ok(default_favicon(bookmark.node_type));
        }

        match self.blobs.get(&bookmark.favicon).await {
            Ok(favicon) => Ok(FileInfo {
                mime_type: mime_for(&favicon.id).to_string(),
                name: favicon.id,
                payload: favicon.payload,
                modified: favicon.modified,
            }),
            Err(e) => {
                error!(favicon = %bookmark.favicon, error = %e, "a favicon was defined but is not available");
                Ok(default_favicon(bookmark.node_type))
            }
        }
    }

    pub async fn get_favicon_by_id(&self, favicon_id: &str) -> Result<FileInfo> {
        if favicon_id.is_empty() {
            return Err(BookmarkError::validation("missing favicon id parameter"));
        }
        let favicon = self.blobs.get(favicon_id).await.map_err(|e| match e {
            BlobError::NotFound(_) | BlobError::InvalidId(_) => {
                BookmarkError::not_found(format!("could not find favicon with id '{favicon_id}'"))
            }
            other => other.into(),
        })?;
        Ok(FileInfo {
            mime_type: mime_for(&favicon.id).to_string(),
            name: favicon.id,
            payload: favicon.payload,
            modified: favicon.modified,
        })
    }

    /// Distinct favicons used by the user's bookmarks, optionally only those
    /// of bookmarks matching `search` by name.
    ///
    /// Favicons with identical payloads are reported once. Payloads are not
    /// included.
    pub async fn get_available_favicons(&self, user: &User, search: &str) -> Result<Vec<FileInfo>> {
        let (owner, term) = (user.username.clone(), search.to_string());
        let bookmarks = self
            .run_blocking(move |app| {
                Ok(app.store.read(|repo| {
                    if term.is_empty() {
                        repo.get_all_bookmarks(&owner)
                    } else {
                        repo.get_bookmarks_by_name(&term, &owner)
                    }
                })?)
            })
            .await?;

        let ids: BTreeSet<String> = bookmarks
            .into_iter()
            .map(|b| b.favicon)
            .filter(|f| !f.is_empty())
            .collect();

        let mut by_payload: BTreeMap<String, FileInfo> = BTreeMap::new();
        for id in ids {
            let Ok(favicon) = self.blobs.get(&id).await else {
                continue;
            };
            if favicon.payload.is_empty() {
                continue;
            }
            by_payload
                .entry(sha1_hex(&favicon.payload))
                .or_insert_with(|| FileInfo {
                    mime_type: mime_for(&favicon.id).to_string(),
                    name: favicon.id,
                    payload: Vec::new(),
                    modified: favicon.modified,
                });
        }

        let mut favicons: Vec<FileInfo> = by_payload.into_values().collect();
        favicons.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(favicons)
    }

    // -----------------------------------------------------------------------
    // Acquisition
    // -----------------------------------------------------------------------

    /// Discover the favicon of the bookmark's page and attach it.
    ///
    /// Returns the content-addressed favicon id.
    pub async fn fetch_favicon(&self, bookmark: &Bookmark) -> Result<String> {
        let content = self
            .icons
            .favicon_for_page(&bookmark.url)
            .await
            .map_err(|e| BookmarkError::Backend(e.to_string()))?;
        self.attach_favicon(bookmark, content).await
    }

    /// Download the icon at `icon_url` and attach it to the bookmark.
    pub async fn fetch_favicon_url(&self, icon_url: &str, bookmark: &Bookmark) -> Result<String> {
        let content = self
            .icons
            .favicon_from_url(icon_url)
            .await
            .map_err(|e| BookmarkError::Backend(e.to_string()))?;
        self.attach_favicon(bookmark, content).await
    }

    /// Scale the icon, store it under its content address and point the
    /// bookmark at it.
    async fn attach_favicon(&self, bookmark: &Bookmark, content: Content) -> Result<String> {
        let content = tokio::task::spawn_blocking(move || resize_to_width(content, FAVICON_WIDTH))
            .await
            .map_err(|e| BookmarkError::Internal(e.to_string()))?;
        let favicon_id = content_address(&content.file_name, &content.payload);
        self.blobs
            .save(&favicon_id, &content.payload, Utc::now())
            .await?;

        let (id, owner, favicon) = (
            bookmark.id.clone(),
            bookmark.user_name.clone(),
            favicon_id.clone(),
        );
        let patched = self
            .run_blocking(move |app| {
                Ok(app
                    .store
                    .in_unit_of_work(|repo| repo.set_favicon(&id, &owner, &favicon))?)
            })
            .await?;

        if patched {
            info!(id = %bookmark.id, favicon = %favicon_id, "favicon attached");
        } else {
            debug!(id = %bookmark.id, "bookmark is gone, favicon not attached");
        }
        Ok(favicon_id)
    }

    /// Start a detached favicon task for `bookmark` if one is needed.
    ///
    /// A custom icon URL always wins; otherwise nodes without a favicon get
    /// one discovered from their page.
    pub(crate) fn spawn_favicon_acquisition(&self, bookmark: &Bookmark, custom_url: Option<&str>) {
        let custom_url = custom_url.filter(|u| !u.is_empty()).map(str::to_string);
        let needs_discovery = bookmark.node_type == NodeType::Node
            && bookmark.favicon.is_empty()
            && !bookmark.url.is_empty();
        if custom_url.is_none() && !needs_discovery {
            return;
        }
        let Some(runtime) = &self.runtime else {
            debug!(id = %bookmark.id, "no runtime available, skipping favicon task");
            return;
        };

        let app = self.clone();
        let bookmark = bookmark.clone();
        runtime.spawn(async move {
            let result = match custom_url {
                Some(url) => app.fetch_favicon_url(&url, &bookmark).await,
                None => app.fetch_favicon(&bookmark).await,
            };
            if let Err(e) = result {
                warn!(id = %bookmark.id, url = %bookmark.url, error = %e, "could not fetch favicon");
            }
        });
    }

    // -----------------------------------------------------------------------
    // Cleanup
    // -----------------------------------------------------------------------

    /// Remove favicon blobs no bookmark of any user refers to anymore.
    ///
    /// Returns the ids that were removed.
    pub async fn remove_unreferenced_favicons(&self, ids: Vec<String>) -> Vec<String> {
        let mut removed = Vec::new();
        for id in ids {
            let favicon = id.clone();
            let count = self
                .run_blocking(move |app| {
                    Ok(app
                        .store
                        .read(|repo| repo.num_bookmarks_referencing_favicon(&favicon))?)
                })
                .await;

            match count {
                Ok(0) => match self.blobs.delete(&id).await {
                    Ok(()) => {
                        debug!(favicon = %id, "unreferenced favicon removed");
                        removed.push(id);
                    }
                    Err(BlobError::NotFound(_)) => {}
                    Err(e) => warn!(favicon = %id, error = %e, "could not remove favicon"),
                },
                Ok(_) => {}
                Err(e) => warn!(favicon = %id, error = %e, "could not count favicon references"),
            }
        }
        removed
    }

    pub(crate) fn spawn_favicon_cleanup(&self, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        let Some(runtime) = &self.runtime else {
            debug!("no runtime available, skipping favicon cleanup");
            return;
        };
        let app = self.clone();
        runtime.spawn(async move {
            app.remove_unreferenced_favicons(ids).await;
        });
    }
}

fn default_favicon(node_type: NodeType) -> FileInfo {
    let payload = match node_type {
        NodeType::Node => DEFAULT_NODE_ICON,
        NodeType::Folder => DEFAULT_FOLDER_ICON,
        NodeType::FileItem => DEFAULT_FILE_ICON,
    };
    let modified = DateTime::parse_from_rfc3339(DEFAULT_FAVICON_MODIFIED)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    FileInfo {
        name: DEFAULT_FAVICON_NAME.to_string(),
        mime_type: mime_for(DEFAULT_FAVICON_NAME).to_string(),
        payload: payload.to_vec(),
        modified,
    }
}
