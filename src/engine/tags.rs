//! Tag attachment shared by tagging, merging and forking

use super::error::GraphResult;
use super::session::Session;
use crate::graph::{ElementData, ElementId, GraphElement, ShareLevel, Tag};
use serde::{Deserialize, Serialize};

/// Description of a tag to attach
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSpec {
    /// External resource the tag identifies; one tag per owner and URI
    pub external_uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub comment: String,
}

impl TagSpec {
    pub fn new(external_uri: impl Into<String>) -> Self {
        Self {
            external_uri: external_uri.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

/// Load the owner's tag for `spec.external_uri`, creating it if absent
fn tag_for(session: &Session<'_>, owner: &str, spec: &TagSpec) -> GraphResult<Tag> {
    let id = ElementId::for_tag(owner, &spec.external_uri);
    match session.find(&id)? {
        Some(GraphElement::Tag(tag)) => Ok(tag),
        Some(_) => Err(super::GraphError::WrongKind {
            id,
            expected: crate::graph::ElementKind::Tag,
        }),
        None => {
            let mut tag = Tag::new(owner, spec.external_uri.clone());
            tag.data.label = spec.label.clone();
            tag.data.comment = spec.comment.clone();
            Ok(tag)
        }
    }
}

/// Reference the owner's tag for `spec` from `data`
///
/// The caller stores `data` afterwards. Already attached tags are returned
/// unchanged. Tags attached inside a pattern become public.
pub(crate) fn attach_tag(
    session: &mut Session<'_>,
    data: &mut ElementData,
    spec: &TagSpec,
) -> GraphResult<Tag> {
    let mut tag = tag_for(session, data.owner(), spec)?;
    if data.has_tag(&spec.external_uri) {
        return Ok(tag);
    }
    if data.in_pattern() && tag.data.share_level != ShareLevel::Public {
        tag.data.share_level = ShareLevel::Public;
        tag.data.touch();
    }
    tag.nb_neighbors.increment(data.share_level);
    data.tags
        .insert(spec.external_uri.clone(), tag.id().clone());
    data.touch();
    session.put(tag.clone())?;
    Ok(tag)
}

/// Stop referencing the tag for `external_uri`; returns whether it was attached
pub(crate) fn detach_tag(
    session: &mut Session<'_>,
    data: &mut ElementData,
    external_uri: &str,
) -> GraphResult<bool> {
    let Some(tag_id) = data.tags.remove(external_uri) else {
        return Ok(false);
    };
    let mut tag = session.tag(&tag_id)?;
    tag.nb_neighbors.decrement(data.share_level);
    session.put(tag)?;
    data.touch();
    Ok(true)
}
