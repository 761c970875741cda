//! Resolution of change notifications to cache tags.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::error::AppError;
use crate::application::repos::{ContentStore, referencing_slugs};
use crate::cache::{TagNamespace, TagSet};
use crate::domain::notification::ChangeNotification;
use crate::domain::types::{DocumentType, ReferencingType};

/// What a notification resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Tags to invalidate; never empty.
    Tags(TagSet),
    /// A well-formed notification for a type the site does not render.
    Unhandled(String),
}

/// Tags derivable from the type and slug alone.
///
/// For releases this is only the release's own tags; pages embedding the
/// release are found by [`TagResolver::resolve`].
pub fn static_tags(namespace: &TagNamespace, kind: DocumentType, slug: Option<&str>) -> TagSet {
    let mut tags = TagSet::new();
    if kind.is_singleton() {
        tags.insert(namespace.singleton(kind));
        return tags;
    }

    tags.insert(namespace.list(kind));
    if let Some(slug) = slug {
        tags.insert(namespace.entity(kind, slug));
    }
    tags
}

/// Maps notifications to tags, querying the content store for releases.
#[derive(Clone)]
pub struct TagResolver {
    store: Arc<dyn ContentStore>,
    namespace: TagNamespace,
}

impl TagResolver {
    pub fn new(store: Arc<dyn ContentStore>, namespace: TagNamespace) -> Self {
        Self { store, namespace }
    }

    pub fn namespace(&self) -> &TagNamespace {
        &self.namespace
    }

    /// Resolve `notification` to the full tag set.
    ///
    /// Release lookups for referencing collections and projects run
    /// concurrently; if either fails the whole resolution fails.
    #[instrument(
        level = "debug",
        target = "geographer::revalidate",
        skip(self, notification),
        fields(document_type = %notification.document_type)
    )]
    pub async fn resolve(&self, notification: &ChangeNotification) -> Result<Resolution, AppError> {
        let Some(kind) = notification.kind() else {
            return Ok(Resolution::Unhandled(notification.document_type.clone()));
        };

        let mut tags = static_tags(&self.namespace, kind, notification.slug.as_deref());
        if kind != DocumentType::Release {
            return Ok(Resolution::Tags(tags));
        }

        let Some(document_id) = notification.document_id.as_deref() else {
            debug!(
                target = "geographer::revalidate",
                "Release notification carries no document id; skipping reference lookups"
            );
            return Ok(Resolution::Tags(tags));
        };

        let (collections, projects) = tokio::try_join!(
            referencing_slugs(self.store.as_ref(), ReferencingType::Collection, document_id),
            referencing_slugs(self.store.as_ref(), ReferencingType::Project, document_id),
        )?;

        debug!(
            target = "geographer::revalidate",
            document_id,
            collections = collections.len(),
            projects = projects.len(),
            "Resolved release references"
        );

        self.extend_with_references(&mut tags, ReferencingType::Collection, &collections);
        self.extend_with_references(&mut tags, ReferencingType::Project, &projects);
        Ok(Resolution::Tags(tags))
    }

    fn extend_with_references(&self, tags: &mut TagSet, kind: ReferencingType, slugs: &[String]) {
        let kind = kind.document_type();
        for slug in slugs {
            tags.insert(self.namespace.list(kind));
            tags.insert(self.namespace.entity(kind, slug));
        }
    }
}
