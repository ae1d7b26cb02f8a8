//! Parent build resolution

use futures::future::try_join_all;
use sdkci_api::{BuildService, ListBuildsQuery};
use sdkci_core::{Build, Outcomes, Result, Revision};
use tracing::info;

/// Latest build per candidate ancestor, in candidate order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentBuilds {
    slots: Vec<Option<Build>>,
}

impl ParentBuilds {
    pub fn new(slots: Vec<Option<Build>>) -> Self {
        Self { slots }
    }

    /// First candidate that matched a build
    pub fn primary(&self) -> Option<&Build> {
        self.slots.iter().flatten().next()
    }

    /// One slot per candidate; `None` where nothing matched
    pub fn slots(&self) -> &[Option<Build>] {
        &self.slots
    }

    /// Outcomes already recorded on each parent build, per slot
    pub fn outcomes(&self) -> Vec<Option<Outcomes>> {
        self.slots
            .iter()
            .map(|slot| slot.as_ref().map(Build::completed_outcomes))
            .collect()
    }
}

/// Find the most recent build for each candidate revision
///
/// Lookups run concurrently; slot order follows `revisions`. A lookup the
/// service answers with "not found" leaves its slot empty, any other error
/// aborts resolution.
pub async fn resolve_parents<S>(
    service: &S,
    project: &str,
    revisions: &[Revision],
) -> Result<ParentBuilds>
where
    S: BuildService + ?Sized,
{
    let slots = try_join_all(
        revisions
            .iter()
            .map(|revision| lookup_parent(service, project, revision)),
    )
    .await?;
    let parents = ParentBuilds::new(slots);

    info!(
        "Parent builds found: {} of {}",
        parents.slots().iter().flatten().count(),
        revisions.len()
    );
    match parents.primary() {
        Some(build) => info!("Using parent build: {}", build.id),
        None => info!("No parent build found"),
    }

    Ok(parents)
}

async fn lookup_parent<S>(service: &S, project: &str, revision: &Revision) -> Result<Option<Build>>
where
    S: BuildService + ?Sized,
{
    info!("Searching for build against {}", revision);

    match service
        .list_builds(&ListBuildsQuery::latest(project, revision))
        .await
    {
        Ok(builds) => Ok(builds.into_iter().next()),
        Err(e) if e.is_not_found() => {
            info!("No build found against {}: {}", revision, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
