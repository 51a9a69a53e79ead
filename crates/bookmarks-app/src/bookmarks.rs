use std::sync::Arc;

use bookmarks_favicon::IconSource;
use bookmarks_shared::path::{is_within, validate_name, validate_path};
use bookmarks_shared::types::{AppInfo, User};
use bookmarks_shared::{BookmarkError, Result};
use bookmarks_store::bookmarks::virtual_root;
use bookmarks_store::{Bookmark, File, FileObject, NodeType, Repository, Store, StoreError};
use chrono::Utc;
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::blob_store::BlobStore;
use crate::models::{BookmarkInput, FileInfo, SortOrderInput};

/// The bookmark use cases.
///
/// Cheap to clone; all collaborators are shared. Methods touching the store
/// block the calling thread, async callers go through `spawn_blocking`.
/// Favicon acquisition runs as detached tasks on the runtime captured at
/// construction.
#[derive(Clone)]
pub struct Application {
    pub(crate) store: Arc<Store>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    pub(crate) icons: Arc<dyn IconSource>,
    pub(crate) runtime: Option<Handle>,
    build: String,
}

impl Application {
    /// Must be called from within a Tokio runtime for background favicon
    /// tasks to run; see [`Application::with_runtime`] otherwise.
    pub fn new(store: Arc<Store>, blobs: Arc<dyn BlobStore>, icons: Arc<dyn IconSource>) -> Self {
        Self {
            store,
            blobs,
            icons,
            runtime: Handle::try_current().ok(),
            build: "dev".to_string(),
        }
    }

    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_build(mut self, build: impl Into<String>) -> Self {
        self.build = build.into();
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Authenticated user view plus version info.
    pub fn app_info(&self, user: &User) -> AppInfo {
        AppInfo::new(user, env!("CARGO_PKG_VERSION"), self.build.clone())
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    pub fn create_bookmark(&self, input: BookmarkInput, user: &User) -> Result<Bookmark> {
        if input.path.is_empty() || input.display_name.is_empty() {
            error!("required fields of bookmarks missing (path or display_name)");
            return Err(BookmarkError::validation(
                "invalid request data supplied, missing path or display_name",
            ));
        }
        validate_path(&input.path).map_err(BookmarkError::Validation)?;
        validate_name(&input.display_name).map_err(BookmarkError::Validation)?;

        let mut draft = Bookmark::new(
            user.username.as_str(),
            input.path.as_str(),
            input.display_name.as_str(),
            input.node_type,
        );
        draft.sort_order = input.sort_order;
        draft.highlight = input.highlight;
        draft.invert_favicon_color = input.invert_favicon_color;

        match input.node_type {
            NodeType::Node => {
                if input.url.is_empty() {
                    return Err(BookmarkError::validation(
                        "invalid request data supplied, missing url for bookmark",
                    ));
                }
                if input.file.is_some() {
                    return Err(BookmarkError::validation(
                        "invalid request data supplied, a node does not have a file",
                    ));
                }
                draft.url = input.url.clone();
            }
            NodeType::Folder => {}
            NodeType::FileItem => {
                let has_payload = input.file.as_ref().is_some_and(|f| !f.payload.is_empty());
                if !has_payload {
                    return Err(BookmarkError::validation(
                        "invalid request data supplied, missing file for bookmark",
                    ));
                }
                draft.url = input.url.clone();
            }
        }

        let saved = self
            .store
            .in_unit_of_work(|repo| -> Result<Bookmark> {
                if let Some(upload) = &input.file {
                    let id = Uuid::new_v4().to_string();
                    let file = File {
                        id: id.clone(),
                        name: upload.name.clone(),
                        mime_type: upload.mime_type.clone(),
                        size: upload.payload.len() as i64,
                        modified: Utc::now(),
                        file_object_id: None,
                    };
                    let object = FileObject {
                        id,
                        payload: upload.payload.clone(),
                    };
                    draft.file_id = Some(repo.save_file(&file, &object)?.id);
                }
                Ok(repo.create(draft)?)
            })
            .inspect_err(|e| error!(error = %e, "could not create a new bookmark"))?;

        info!(id = %saved.id, user = %user.username, "bookmark created");

        self.spawn_favicon_acquisition(&saved, input.custom_favicon_url.as_deref());
        Ok(saved)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn get_bookmark_by_id(&self, id: &str, user: &User) -> Result<Bookmark> {
        if id.is_empty() {
            return Err(BookmarkError::validation("missing id parameter"));
        }
        self.store
            .read(|repo| repo.get_bookmark_by_id(id, &user.username))
            .map_err(|e| match e {
                StoreError::NotFound => {
                    BookmarkError::not_found(format!("could not find bookmark with id '{id}'"))
                }
                other => other.into(),
            })
    }

    /// Bookmarks directly under `path`. Backend failures yield an empty list.
    pub fn get_bookmarks_by_path(&self, path: &str, user: &User) -> Result<Vec<Bookmark>> {
        if path.is_empty() {
            return Err(BookmarkError::validation("missing path parameter"));
        }
        match self
            .store
            .read(|repo| repo.get_bookmarks_by_path(path, &user.username))
        {
            Ok(bookmarks) => Ok(bookmarks),
            Err(e) => {
                error!(path = %path, error = %e, "could not get bookmarks by path");
                Ok(Vec::new())
            }
        }
    }

    /// The folder at canonical `path`; `/` yields the synthesized root.
    pub fn get_bookmarks_folder_by_path(&self, path: &str, user: &User) -> Result<Bookmark> {
        if path.is_empty() {
            return Err(BookmarkError::validation("missing path parameter"));
        }
        if path == bookmarks_shared::constants::ROOT_PATH {
            return Ok(virtual_root(&user.username));
        }
        self.store
            .read(|repo| repo.get_folder_by_path(path, &user.username))
            .map_err(|e| match e {
                StoreError::NotFound => {
                    BookmarkError::not_found(format!("could not find folder for path '{path}'"))
                }
                other => other.into(),
            })
    }

    pub fn get_all_paths(&self, user: &User) -> Result<Vec<String>> {
        self.store
            .read(|repo| repo.get_all_paths(&user.username))
            .map_err(|e| {
                error!(error = %e, "could not get all paths");
                BookmarkError::Backend(e.to_string())
            })
    }

    pub fn get_bookmarks_by_name(&self, name: &str, user: &User) -> Result<Vec<Bookmark>> {
        if name.is_empty() {
            return Err(BookmarkError::validation("missing name parameter"));
        }
        Ok(self
            .store
            .read(|repo| repo.get_bookmarks_by_name(name, &user.username))?)
    }

    /// The `limit` most often opened nodes.
    pub fn get_most_visited(&self, limit: u32, user: &User) -> Result<Vec<Bookmark>> {
        if limit == 0 {
            return Err(BookmarkError::validation("the number of items must be positive"));
        }
        Ok(self
            .store
            .read(|repo| repo.get_most_recent_bookmarks(limit, &user.username))?)
    }

    /// Payload of a file item.
    pub fn get_bookmark_file(&self, id: &str, user: &User) -> Result<FileInfo> {
        let bookmark = self.get_bookmark_by_id(id, user)?;
        let Some(file_id) = bookmark.file_id.filter(|_| bookmark.node_type == NodeType::FileItem)
        else {
            return Err(BookmarkError::not_found(format!(
                "bookmark '{id}' has no file attached"
            )));
        };

        self.store
            .read(|repo| -> std::result::Result<FileInfo, StoreError> {
                let file = repo.get_file(&file_id)?;
                let object_id = file.file_object_id.clone().ok_or(StoreError::NotFound)?;
                let object = repo.get_file_object(&object_id)?;
                Ok(FileInfo {
                    name: file.name,
                    mime_type: file.mime_type,
                    payload: object.payload,
                    modified: file.modified,
                })
            })
            .map_err(|e| match e {
                StoreError::NotFound => {
                    BookmarkError::not_found(format!("no file available for bookmark '{id}'"))
                }
                other => other.into(),
            })
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    /// Record an access and return the target URL.
    ///
    /// Clears `highlight` and increments `access_count`. Folders cannot be
    /// forwarded to.
    pub fn fetch_and_forward(&self, id: &str, user: &User) -> Result<String> {
        if id.is_empty() {
            return Err(BookmarkError::validation("missing id parameter"));
        }

        let accessed = self
            .store
            .in_unit_of_work(|repo| -> Result<Bookmark> {
                let mut existing = load(repo, id, user)?;
                if existing.is_folder() {
                    warn!(id = %id, "fetch and forward is only valid for nodes");
                    return Err(BookmarkError::validation(format!(
                        "cannot fetch and forward folder - id '{id}'"
                    )));
                }
                existing.highlight = 0;
                existing.access_count += 1;
                Ok(repo.update(existing)?)
            })
            .inspect_err(|e| error!(id = %id, error = %e, "could not fetch and update bookmark"))?;

        info!(id = %id, url = %accessed.url, "forwarding to bookmark url");

        self.spawn_favicon_acquisition(&accessed, None);
        Ok(accessed.url)
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Remove one bookmark. Folders must be empty.
    pub fn delete(&self, id: &str, user: &User) -> Result<()> {
        if id.is_empty() {
            return Err(BookmarkError::validation("missing id parameter"));
        }

        let removed = self
            .store
            .in_unit_of_work(|repo| -> Result<Bookmark> {
                let existing = load(repo, id, user)?;
                if existing.is_folder() && existing.child_count > 0 {
                    return Err(BookmarkError::conflict(format!(
                        "cannot delete folder '{}' because of existing child-elements {}",
                        existing.full_path(),
                        existing.child_count
                    )));
                }
                repo.delete(&existing)?;
                if let Some(file_id) = &existing.file_id {
                    repo.delete_file(file_id)?;
                }
                Ok(existing)
            })
            .inspect_err(|e| error!(id = %id, error = %e, "could not delete bookmark"))?;

        info!(id = %id, user = %user.username, "bookmark deleted");

        if !removed.favicon.is_empty() {
            self.spawn_favicon_cleanup(vec![removed.favicon]);
        }
        Ok(())
    }

    /// Remove a folder by id together with everything below it.
    pub fn delete_folder(&self, id: &str, user: &User) -> Result<()> {
        if id.is_empty() {
            return Err(BookmarkError::validation("missing id parameter"));
        }
        self.remove_subtree(user, |repo| {
            let folder = load(repo, id, user)?;
            if !folder.is_folder() {
                warn!(id = %id, "recursive delete is only applicable for folders");
                return Err(BookmarkError::validation(
                    "recursive delete is only possible for folders",
                ));
            }
            Ok(folder)
        })
    }

    /// Remove the folder at canonical `path` together with everything below it.
    pub fn delete_path(&self, path: &str, user: &User) -> Result<()> {
        if path.is_empty() {
            return Err(BookmarkError::validation("missing path parameter"));
        }
        if path == bookmarks_shared::constants::ROOT_PATH {
            return Err(BookmarkError::validation("cannot delete the root path"));
        }
        validate_path(path).map_err(BookmarkError::Validation)?;

        self.remove_subtree(user, |repo| {
            repo.get_folder_by_path(path, &user.username)
                .map_err(|e| match e {
                    StoreError::NotFound => {
                        BookmarkError::not_found(format!("could not find folder for path '{path}'"))
                    }
                    other => other.into(),
                })
        })
    }

    fn remove_subtree(
        &self,
        user: &User,
        locate: impl FnOnce(&Repository<'_>) -> Result<Bookmark>,
    ) -> Result<()> {
        let (start, favicons) = self
            .store
            .in_unit_of_work(|repo| -> Result<(String, Vec<String>)> {
                let folder = locate(repo)?;
                let start = folder.full_path();

                let below = repo.get_bookmarks_by_path_start(&start, &user.username)?;
                let mut favicons: Vec<String> = std::iter::once(&folder)
                    .chain(below.iter())
                    .filter(|b| !b.favicon.is_empty())
                    .map(|b| b.favicon.clone())
                    .collect();
                favicons.sort();
                favicons.dedup();

                repo.delete_path(&start, &user.username)?;
                for file_id in below.iter().filter_map(|b| b.file_id.as_deref()) {
                    repo.delete_file(file_id)?;
                }
                Ok((start, favicons))
            })
            .inspect_err(|e| error!(error = %e, "could not delete bookmark path"))?;

        info!(path = %start, user = %user.username, "bookmark path deleted");

        self.spawn_favicon_cleanup(favicons);
        Ok(())
    }

    /// Detach and remove the file of a file item.
    pub fn delete_bookmark_file(&self, id: &str, user: &User) -> Result<()> {
        let bookmark = self.get_bookmark_by_id(id, user)?;
        let Some(file_id) = bookmark.file_id else {
            return Err(BookmarkError::not_found(format!(
                "bookmark '{id}' has no file attached"
            )));
        };

        self.store
            .in_unit_of_work(|repo| repo.delete_file(&file_id))
            .map_err(|e| match e {
                StoreError::NotFound => {
                    BookmarkError::not_found(format!("no file available with id '{file_id}'"))
                }
                other => other.into(),
            })?;

        info!(id = %id, file = %file_id, "bookmark file deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Assign new sort positions. Returns the number of updated bookmarks.
    pub fn update_sort_order(&self, sort: &SortOrderInput, user: &User) -> Result<usize> {
        if sort.ids.len() != sort.sort_order.len() {
            return Err(BookmarkError::validation(format!(
                "the number of ids ({}) does not correspond to the number of sort_order entries ({})",
                sort.ids.len(),
                sort.sort_order.len()
            )));
        }

        self.store
            .in_unit_of_work(|repo| -> Result<usize> {
                for (id, order) in sort.ids.iter().zip(&sort.sort_order) {
                    let mut bookmark = load(repo, id, user)?;
                    bookmark.sort_order = *order;
                    repo.update(bookmark)?;
                }
                Ok(sort.ids.len())
            })
            .inspect_err(|e| error!(error = %e, "could not update the sort-order"))
    }

    /// Change an existing bookmark.
    ///
    /// The stored type is kept. Moving or renaming a folder carries its whole
    /// subtree along; a folder cannot be moved into itself or below itself.
    pub fn update(&self, input: BookmarkInput, user: &User) -> Result<Bookmark> {
        if input.id.is_empty() || input.path.is_empty() || input.display_name.is_empty() {
            error!("required fields of bookmarks missing");
            return Err(BookmarkError::validation(
                "invalid request data supplied, missing id, path or display_name",
            ));
        }
        validate_path(&input.path).map_err(BookmarkError::Validation)?;
        validate_name(&input.display_name).map_err(BookmarkError::Validation)?;

        let updated = self
            .store
            .in_unit_of_work(|repo| -> Result<Bookmark> {
                let existing = load(repo, &input.id, user)?;
                let mut child_count = existing.child_count;

                if existing.is_folder() {
                    let folder_path = existing.full_path();
                    if is_within(&input.path, &folder_path) {
                        error!(folder = %folder_path, destination = %input.path, "a folder cannot be moved into itself");
                        return Err(BookmarkError::conflict("cannot move folder into itself"));
                    }
                    child_count = repo
                        .get_path_child_count(&folder_path, &user.username)?
                        .first()
                        .map(|c| c.count as i32)
                        .unwrap_or(0);
                }

                let changed = Bookmark {
                    display_name: input.display_name.clone(),
                    path: input.path.clone(),
                    url: input.url.clone(),
                    sort_order: input.sort_order,
                    highlight: input.highlight,
                    invert_favicon_color: input.invert_favicon_color,
                    child_count,
                    ..existing
                };
                Ok(repo.update(changed)?)
            })
            .inspect_err(|e| error!(id = %input.id, error = %e, "could not update bookmark"))?;

        info!(id = %updated.id, user = %user.username, "bookmark updated");

        self.spawn_favicon_acquisition(&updated, input.custom_favicon_url.as_deref());
        Ok(updated)
    }
}

fn load(repo: &Repository<'_>, id: &str, user: &User) -> Result<Bookmark> {
    repo.get_bookmark_by_id(id, &user.username).map_err(|e| match e {
        StoreError::NotFound => {
            BookmarkError::not_found(format!("could not find bookmark with id '{id}'"))
        }
        other => other.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_blob_store::DbBlobStore;
    use crate::models::FileUpload;
    use async_trait::async_trait;
    use bookmarks_favicon::{Content, FetchError};

    struct NoIcons;

    #[async_trait]
    impl IconSource for NoIcons {
        async fn favicon_for_page(&self, page_url: &str) -> std::result::Result<Content, FetchError> {
            Err(FetchError::EmptyPayload(page_url.to_string()))
        }

        async fn favicon_from_url(&self, icon_url: &str) -> std::result::Result<Content, FetchError> {
            Err(FetchError::EmptyPayload(icon_url.to_string()))
        }
    }

    fn app() -> Application {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let blobs = Arc::new(DbBlobStore::new(store.clone(), 1024));
        Application::new(store, blobs, Arc::new(NoIcons))
    }

    fn user() -> User {
        User::named("u")
    }

    #[test]
    fn create_requires_path_and_name() {
        let app = app();
        for input in [BookmarkInput::folder("", "A"), BookmarkInput::folder("/", "")] {
            assert!(matches!(
                app.create_bookmark(input, &user()),
                Err(BookmarkError::Validation(_))
            ));
        }
    }

    #[test]
    fn create_node_requires_url() {
        let app = app();
        let err = app
            .create_bookmark(BookmarkInput::node("/", "N", ""), &user())
            .unwrap_err();
        assert!(matches!(err, BookmarkError::Validation(_)));
    }

    #[test]
    fn create_under_missing_parent_is_hierarchy_error() {
        let app = app();
        let err = app
            .create_bookmark(BookmarkInput::folder("/missing", "A"), &user())
            .unwrap_err();
        assert!(matches!(err, BookmarkError::Hierarchy(_)));
    }

    #[test]
    fn file_item_round_trip() {
        let app = app();
        let input = BookmarkInput {
            node_type: NodeType::FileItem,
            file: Some(FileUpload {
                name: "notes.txt".into(),
                mime_type: "text/plain".into(),
                payload: b"hello".to_vec(),
            }),
            ..BookmarkInput::folder("/", "Notes")
        };
        let item = app.create_bookmark(input, &user()).unwrap();
        assert!(item.file_id.is_some());

        let file = app.get_bookmark_file(&item.id, &user()).unwrap();
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.payload, b"hello");

        app.delete_bookmark_file(&item.id, &user()).unwrap();
        assert!(matches!(
            app.get_bookmark_file(&item.id, &user()),
            Err(BookmarkError::NotFound(_))
        ));
        assert_eq!(app.get_bookmark_by_id(&item.id, &user()).unwrap().file_id, None);
    }

    #[test]
    fn file_item_requires_payload() {
        let app = app();
        let input = BookmarkInput {
            node_type: NodeType::FileItem,
            ..BookmarkInput::folder("/", "Empty")
        };
        assert!(matches!(
            app.create_bookmark(input, &user()),
            Err(BookmarkError::Validation(_))
        ));
    }

    #[test]
    fn get_by_id_validation_and_not_found() {
        let app = app();
        assert!(matches!(
            app.get_bookmark_by_id("", &user()),
            Err(BookmarkError::Validation(_))
        ));
        assert!(matches!(
            app.get_bookmark_by_id("missing", &user()),
            Err(BookmarkError::NotFound(_))
        ));
    }

    #[test]
    fn bookmarks_are_scoped_by_user() {
        let app = app();
        let item = app
            .create_bookmark(BookmarkInput::folder("/", "A"), &user())
            .unwrap();
        assert!(matches!(
            app.get_bookmark_by_id(&item.id, &User::named("other")),
            Err(BookmarkError::NotFound(_))
        ));
    }

    #[test]
    fn virtual_root_folder() {
        let app = app();
        let root = app.get_bookmarks_folder_by_path("/", &user()).unwrap();
        assert_eq!(root.id, "u_ROOT");
        assert_eq!(root.display_name, "Root");

        assert!(matches!(
            app.get_bookmarks_folder_by_path("/nope", &user()),
            Err(BookmarkError::NotFound(_))
        ));
    }

    #[test]
    fn delete_non_empty_folder_conflicts() {
        let app = app();
        let a = app
            .create_bookmark(BookmarkInput::folder("/", "A"), &user())
            .unwrap();
        app.create_bookmark(BookmarkInput::node("/A", "N", "http://x"), &user())
            .unwrap();

        let err = app.delete(&a.id, &user()).unwrap_err();
        assert_eq!(
            err,
            BookmarkError::Conflict(
                "cannot delete folder '/A' because of existing child-elements 1".into()
            )
        );
        assert_eq!(app.get_bookmark_by_id(&a.id, &user()).unwrap().child_count, 1);
    }

    #[test]
    fn move_folder_into_itself_conflicts() {
        let app = app();
        let a = app
            .create_bookmark(BookmarkInput::folder("/", "A"), &user())
            .unwrap();
        app.create_bookmark(BookmarkInput::folder("/A", "B"), &user())
            .unwrap();

        for target in ["/A", "/A/B"] {
            let input = BookmarkInput {
                id: a.id.clone(),
                ..BookmarkInput::folder(target, "A")
            };
            assert!(matches!(
                app.update(input, &user()),
                Err(BookmarkError::Conflict(_))
            ));
        }
        assert_eq!(app.get_all_paths(&user()).unwrap(), vec!["/", "/A", "/A/B"]);
    }

    #[test]
    fn update_ignores_type_change() {
        let app = app();
        let n = app
            .create_bookmark(BookmarkInput::node("/", "N", "http://x"), &user())
            .unwrap();
        let input = BookmarkInput {
            id: n.id.clone(),
            ..BookmarkInput::folder("/", "N2")
        };
        let updated = app.update(input, &user()).unwrap();
        assert_eq!(updated.node_type, NodeType::Node);
        assert_eq!(updated.display_name, "N2");
    }

    #[test]
    fn display_name_must_be_one_segment() {
        let app = app();
        assert!(matches!(
            app.create_bookmark(BookmarkInput::folder("/", "a/b"), &user()),
            Err(BookmarkError::Validation(_))
        ));

        let a = app.create_bookmark(BookmarkInput::folder("/", "a"), &user()).unwrap();
        let input = BookmarkInput {
            id: a.id.clone(),
            ..BookmarkInput::folder("/", "a/b")
        };
        assert!(matches!(app.update(input, &user()), Err(BookmarkError::Validation(_))));

        assert_eq!(app.get_all_paths(&user()).unwrap(), vec!["/", "/a"]);
        app.create_bookmark(BookmarkInput::node("/a", "child", "http://x"), &user())
            .unwrap();
    }

    #[test]
    fn search_by_name_matches_umlauts() {
        let app = app();
        app.create_bookmark(BookmarkInput::node("/", "Äpfel", "http://x"), &user())
            .unwrap();
        for term in ["Äpfel", "äpfel"] {
            assert_eq!(app.get_bookmarks_by_name(term, &user()).unwrap().len(), 1);
        }
    }

    #[test]
    fn sort_order_lengths_must_match() {
        let app = app();
        let sort = SortOrderInput {
            ids: vec!["a".into()],
            sort_order: vec![],
        };
        assert!(matches!(
            app.update_sort_order(&sort, &user()),
            Err(BookmarkError::Validation(_))
        ));
    }

    #[test]
    fn sort_order_is_idempotent() {
        let app = app();
        let a = app
            .create_bookmark(BookmarkInput::node("/", "a", "http://a"), &user())
            .unwrap();
        let b = app
            .create_bookmark(BookmarkInput::node("/", "b", "http://b"), &user())
            .unwrap();
        let sort = SortOrderInput {
            ids: vec![a.id.clone(), b.id.clone()],
            sort_order: vec![2, 1],
        };

        let mut orders = Vec::new();
        for _ in 0..2 {
            assert_eq!(app.update_sort_order(&sort, &user()).unwrap(), 2);
            let names: Vec<_> = app
                .get_bookmarks_by_path("/", &user())
                .unwrap()
                .into_iter()
                .map(|b| b.display_name)
                .collect();
            orders.push(names);
        }
        assert_eq!(orders[0], vec!["b", "a"]);
        assert_eq!(orders[0], orders[1]);
    }

    #[test]
    fn sort_order_rolls_back_on_unknown_id() {
        let app = app();
        let a = app
            .create_bookmark(BookmarkInput::node("/", "a", "http://a"), &user())
            .unwrap();
        let sort = SortOrderInput {
            ids: vec![a.id.clone(), "missing".into()],
            sort_order: vec![7, 8],
        };
        assert!(matches!(
            app.update_sort_order(&sort, &user()),
            Err(BookmarkError::NotFound(_))
        ));
        assert_eq!(app.get_bookmark_by_id(&a.id, &user()).unwrap().sort_order, 0);
    }

    #[test]
    fn fetch_and_forward_rejects_folder() {
        let app = app();
        let mut input = BookmarkInput::folder("/", "A");
        input.highlight = 1;
        let a = app.create_bookmark(input, &user()).unwrap();

        assert!(matches!(
            app.fetch_and_forward(&a.id, &user()),
            Err(BookmarkError::Validation(_))
        ));
        assert_eq!(app.get_bookmark_by_id(&a.id, &user()).unwrap().highlight, 1);
    }

    #[test]
    fn delete_path_validation() {
        let app = app();
        for path in ["", "/"] {
            assert!(matches!(
                app.delete_path(path, &user()),
                Err(BookmarkError::Validation(_))
            ));
        }
        assert!(matches!(
            app.delete_path("/missing", &user()),
            Err(BookmarkError::NotFound(_))
        ));
    }

    #[test]
    fn delete_folder_requires_folder() {
        let app = app();
        let n = app
            .create_bookmark(BookmarkInput::node("/", "N", "http://x"), &user())
            .unwrap();
        assert!(matches!(
            app.delete_folder(&n.id, &user()),
            Err(BookmarkError::Validation(_))
        ));
    }

    #[test]
    fn most_visited_counts_accesses() {
        let app = app();
        let a = app
            .create_bookmark(BookmarkInput::node("/", "a", "http://a"), &user())
            .unwrap();
        let b = app
            .create_bookmark(BookmarkInput::node("/", "b", "http://b"), &user())
            .unwrap();
        for _ in 0..3 {
            app.fetch_and_forward(&b.id, &user()).unwrap();
        }
        app.fetch_and_forward(&a.id, &user()).unwrap();

        let visited = app.get_most_visited(10, &user()).unwrap();
        let ids: Vec<_> = visited.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec![b.id.as_str(), a.id.as_str()]);
        assert_eq!(visited[0].access_count, 3);
    }

    #[test]
    fn app_info_reports_user_and_build() {
        let app = app().with_build("42");
        let info = app.app_info(&user());
        assert_eq!(info.user.user_name, "u");
        assert_eq!(info.version.build, "42");
    }
}
