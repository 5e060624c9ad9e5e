//! Center registry: elements a user recently focused on
//!
//! Each listing filters the centered elements to one scope, orders them by
//! `last_center_date` (newest first) and pages through them. What an entry
//! reveals about the neighborhood depends on the scope: only owners see
//! totals, and only owners and friends see friend counts.

mod friends;

pub use friends::{FriendOracle, FriendRegistry};

use crate::engine::{GraphEngine, GraphResult, Session};
use crate::graph::{ElementId, GraphElement, NbNeighbors, ShareLevel};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One centered element as shown in a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterEntry {
    pub element: GraphElement,
    pub last_center_date: DateTime<Utc>,
    pub nb_visits: u32,
    /// Labels of neighboring vertices visible in this scope
    pub context: BTreeMap<ElementId, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nb_references: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nb_public_neighbors: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nb_friend_neighbors: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nb_neighbors_total: Option<u32>,
}

impl CenterEntry {
    pub fn id(&self) -> &ElementId {
        self.element.id()
    }
}

/// Which centers a listing may show
#[derive(Debug, Clone)]
enum Scope {
    Owner(String),
    Public { owner: Option<String> },
    Patterns,
    Friends { requester: String, friends: Vec<String> },
}

impl Scope {
    fn admits(&self, element: &GraphElement) -> bool {
        let data = element.data();
        match self {
            Scope::Owner(owner) => data.owner() == owner,
            Scope::Public { owner } => {
                data.share_level.is_public()
                    && owner.as_deref().map_or(true, |o| data.owner() == o)
            }
            Scope::Patterns => data.is_pattern,
            Scope::Friends { requester, friends } => {
                data.owner() != requester
                    && data.share_level >= ShareLevel::Friends
                    && friends.iter().any(|f| f == data.owner())
            }
        }
    }

    /// Levels of neighbors whose labels may appear in the context
    fn context_levels(&self) -> &'static [ShareLevel] {
        match self {
            Scope::Owner(_) => &ShareLevel::ALL,
            Scope::Friends { .. } => &[ShareLevel::Friends, ShareLevel::Public],
            Scope::Public { .. } | Scope::Patterns => &[ShareLevel::Public],
        }
    }

    fn project(&self, counts: &NbNeighbors, entry: &mut CenterEntry) {
        entry.nb_public_neighbors = Some(counts.public);
        match self {
            Scope::Owner(_) => {
                entry.nb_friend_neighbors = Some(counts.friend);
                entry.nb_neighbors_total = Some(counts.total());
            }
            Scope::Friends { .. } => entry.nb_friend_neighbors = Some(counts.friend),
            Scope::Public { .. } | Scope::Patterns => {}
        }
    }
}

/// Paged center listing, created by [`GraphEngine::centers`]
pub struct CenterQuery<'e> {
    engine: &'e GraphEngine,
    limit: usize,
    skip: usize,
}

impl<'e> CenterQuery<'e> {
    pub(crate) fn new(engine: &'e GraphEngine) -> Self {
        Self {
            engine,
            limit: engine.config().center_page_limit,
            skip: 0,
        }
    }

    /// Maximum number of entries returned
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Number of entries skipped before the page starts
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Every center of `owner`, with full neighbor counts
    pub fn for_owner(&self, owner: &str) -> GraphResult<Vec<CenterEntry>> {
        self.list(Scope::Owner(owner.to_string()))
    }

    /// Public centers of every user
    pub fn public(&self) -> GraphResult<Vec<CenterEntry>> {
        self.list(Scope::Public { owner: None })
    }

    /// Public centers of one user
    pub fn public_of_user(&self, owner: &str) -> GraphResult<Vec<CenterEntry>> {
        self.list(Scope::Public {
            owner: Some(owner.to_string()),
        })
    }

    /// Centered pattern vertices of every user
    pub fn patterns(&self) -> GraphResult<Vec<CenterEntry>> {
        self.list(Scope::Patterns)
    }

    /// Centers of `friend` visible to `requester`; empty unless they are
    /// confirmed friends
    pub fn for_friend(&self, requester: &str, friend: &str) -> GraphResult<Vec<CenterEntry>> {
        let friends = match self.engine.friend_oracle() {
            Some(oracle) if oracle.is_confirmed_friend(requester, friend) => {
                vec![friend.to_string()]
            }
            _ => return Ok(Vec::new()),
        };
        self.list(Scope::Friends {
            requester: requester.to_string(),
            friends,
        })
    }

    /// Centers of every confirmed friend of `requester`
    pub fn friends_feed(&self, requester: &str) -> GraphResult<Vec<CenterEntry>> {
        let Some(oracle) = self.engine.friend_oracle() else {
            return Ok(Vec::new());
        };
        let requester = requester.to_string();
        self.engine.read(|session| {
            let mut owners: Vec<String> = session
                .centered()?
                .iter()
                .map(|e| e.data().owner().to_string())
                .filter(|owner| owner != &requester)
                .collect();
            owners.sort();
            owners.dedup();
            owners.retain(|owner| oracle.is_confirmed_friend(&requester, owner));
            let scope = Scope::Friends {
                requester: requester.clone(),
                friends: owners,
            };
            self.collect(session, &scope)
        })
    }

    fn list(&self, scope: Scope) -> GraphResult<Vec<CenterEntry>> {
        self.engine.read(|session| self.collect(session, &scope))
    }

    fn collect(&self, session: &Session<'_>, scope: &Scope) -> GraphResult<Vec<CenterEntry>> {
        let mut centered: Vec<(DateTime<Utc>, GraphElement)> = session
            .centered()?
            .into_iter()
            .filter(|e| scope.admits(e))
            .filter_map(|e| e.data().last_center_date.map(|date| (date, e)))
            .collect();
        centered.sort_by(|(a_date, a), (b_date, b)| b_date.cmp(a_date).then_with(|| a.id().cmp(b.id())));

        centered
            .into_iter()
            .skip(self.skip)
            .take(self.limit)
            .map(|(date, element)| self.entry(session, scope, date, element))
            .collect()
    }

    fn entry(
        &self,
        session: &Session<'_>,
        scope: &Scope,
        last_center_date: DateTime<Utc>,
        element: GraphElement,
    ) -> GraphResult<CenterEntry> {
        let context = self.context(session, scope, &element)?;
        let mut entry = CenterEntry {
            nb_visits: element.data().nb_visits,
            last_center_date,
            context,
            nb_references: None,
            nb_public_neighbors: None,
            nb_friend_neighbors: None,
            nb_neighbors_total: None,
            element,
        };
        let counts = match &entry.element {
            GraphElement::Vertex(vertex) => Some(vertex.nb_neighbors),
            GraphElement::Tag(tag) => {
                entry.nb_references = Some(tag.nb_references());
                Some(tag.nb_neighbors)
            }
            GraphElement::Relation(_) | GraphElement::GroupRelation(_) => None,
        };
        if let Some(counts) = counts {
            scope.project(&counts, &mut entry);
        }
        Ok(entry)
    }

    /// Labels of adjacent vertices at the scope's levels, capped by config
    fn context(
        &self,
        session: &Session<'_>,
        scope: &Scope,
        element: &GraphElement,
    ) -> GraphResult<BTreeMap<ElementId, String>> {
        let mut context = BTreeMap::new();
        let Some(vertex) = element.as_vertex() else {
            return Ok(context);
        };
        let limit = self.engine.config().context_size;
        let levels = scope.context_levels();
        for relation_id in &vertex.relations {
            if context.len() >= limit {
                break;
            }
            let relation = session.relation(relation_id)?;
            if !levels.contains(&relation.data.share_level) {
                continue;
            }
            let other = relation.other_end(vertex.id());
            if other == vertex.id() || context.contains_key(other) {
                continue;
            }
            let neighbor = session.vertex(other)?;
            if levels.contains(&neighbor.data.share_level) {
                context.insert(other.clone(), neighbor.data.label);
            }
        }
        Ok(context)
    }
}
