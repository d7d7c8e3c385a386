// ── Site lifecycle ──
//
// Requested → AddressPlanned → Provisioned → HardwareBound → Active, with
// `Failed` reachable from every non-terminal state. Every transition goes
// through `Site::enter`, which rejects anything off that path and appends
// to the site's history.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use thiserror::Error;
use uuid::Uuid;

use crate::allocator::SitePlan;
use crate::config::SiteRequest;
use crate::error::{AllocationOverflow, ClaimError, CoreError, RemoteFailure};

/// The forward stages of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SiteStage {
    Requested,
    AddressPlanned,
    Provisioned,
    HardwareBound,
    Active,
}

impl SiteStage {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Requested => Some(Self::AddressPlanned),
            Self::AddressPlanned => Some(Self::Provisioned),
            Self::Provisioned => Some(Self::HardwareBound),
            Self::HardwareBound => Some(Self::Active),
            Self::Active => None,
        }
    }
}

/// What made a site fail.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum FailureCause {
    #[error(transparent)]
    Allocation(AllocationOverflow),
    #[error(transparent)]
    Remote(RemoteFailure),
    #[error(transparent)]
    Claim(ClaimError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SiteState {
    Requested,
    AddressPlanned,
    Provisioned,
    HardwareBound,
    Active,
    /// `stage` is the stage the site was trying to reach.
    Failed {
        stage: SiteStage,
        cause: FailureCause,
    },
}

impl SiteState {
    fn at(stage: SiteStage) -> Self {
        match stage {
            SiteStage::Requested => Self::Requested,
            SiteStage::AddressPlanned => Self::AddressPlanned,
            SiteStage::Provisioned => Self::Provisioned,
            SiteStage::HardwareBound => Self::HardwareBound,
            SiteStage::Active => Self::Active,
        }
    }

    /// The stage reached, or for `Failed` the stage that was being attempted.
    pub fn stage(&self) -> SiteStage {
        match self {
            Self::Requested => SiteStage::Requested,
            Self::AddressPlanned => SiteStage::AddressPlanned,
            Self::Provisioned => SiteStage::Provisioned,
            Self::HardwareBound => SiteStage::HardwareBound,
            Self::Active => SiteStage::Active,
            Self::Failed { stage, .. } => *stage,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_terminal(&self) -> bool {
        self.is_active() || self.is_failed()
    }
}

impl fmt::Display for SiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { stage, .. } => write!(f, "failed ({stage})"),
            other => write!(f, "{}", other.stage()),
        }
    }
}

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: SiteStage,
    pub to: SiteStage,
    /// `false` when the site failed while attempting `to`.
    pub succeeded: bool,
    pub at: DateTime<Utc>,
}

/// A site moving through the provisioning workflow.
#[derive(Debug, Clone, Serialize)]
pub struct Site {
    name: String,
    zone: u32,
    index: u32,
    state: SiteState,
    plan: Option<SitePlan>,
    remote_id: Option<Uuid>,
    history: Vec<Transition>,
}

impl Site {
    pub fn requested(request: &SiteRequest) -> Self {
        Self {
            name: request.name.clone(),
            zone: request.zone,
            index: request.site,
            state: SiteState::Requested,
            plan: None,
            remote_id: None,
            history: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn zone(&self) -> u32 {
        self.zone
    }

    /// Slot of the site within its zone.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn state(&self) -> &SiteState {
        &self.state
    }

    /// The address plan, once assigned. Never replaced afterwards.
    pub fn plan(&self) -> Option<&SitePlan> {
        self.plan.as_ref()
    }

    /// Controller-side site id, once provisioned.
    pub fn remote_id(&self) -> Option<Uuid> {
        self.remote_id
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    pub(crate) fn assign_plan(&mut self, plan: SitePlan) -> Result<(), CoreError> {
        self.enter(SiteStage::AddressPlanned)?;
        self.plan = Some(plan);
        Ok(())
    }

    pub(crate) fn mark_provisioned(&mut self, remote_id: Uuid) -> Result<(), CoreError> {
        self.enter(SiteStage::Provisioned)?;
        self.remote_id = Some(remote_id);
        Ok(())
    }

    pub(crate) fn mark_hardware_bound(&mut self) -> Result<(), CoreError> {
        self.enter(SiteStage::HardwareBound)
    }

    pub(crate) fn activate(&mut self) -> Result<(), CoreError> {
        self.enter(SiteStage::Active)
    }

    /// Fail the stage currently being attempted.
    pub(crate) fn fail(&mut self, cause: FailureCause) -> Result<(), CoreError> {
        let from = self.state.stage();
        let next = match (&self.state, from.next()) {
            (state, Some(next)) if !state.is_terminal() => next,
            _ => return Err(self.invalid("failed")),
        };
        self.record(from, next, false);
        self.state = SiteState::Failed { stage: next, cause };
        Ok(())
    }

    fn enter(&mut self, to: SiteStage) -> Result<(), CoreError> {
        let from = self.state.stage();
        if self.state.is_terminal() || from.next() != Some(to) {
            return Err(self.invalid(&to.to_string()));
        }
        self.record(from, to, true);
        self.state = SiteState::at(to);
        Ok(())
    }

    fn record(&mut self, from: SiteStage, to: SiteStage, succeeded: bool) {
        tracing::debug!(site = %self.name, %from, %to, succeeded, "site transition");
        self.history.push(Transition {
            from,
            to,
            succeeded,
            at: Utc::now(),
        });
    }

    fn invalid(&self, to: &str) -> CoreError {
        CoreError::InvalidTransition {
            site: self.name.clone(),
            from: self.state.to_string(),
            to: to.to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::allocator::{SubnetSpec, TopologyAllocator, TopologyLayout};

    fn plan() -> SitePlan {
        TopologyAllocator::new(TopologyLayout {
            supernet: "10.0.0.0/16".parse().unwrap(),
            zone_count: 4,
            zone_prefix: 18,
            sites_per_zone: 64,
            site_prefix: 24,
            subnets: vec![SubnetSpec::new("mgmt", 20)],
        })
        .site_plan(0, 0)
        .unwrap()
    }

    fn site() -> Site {
        Site::requested(&SiteRequest::new("hq", 0, 0))
    }

    #[test]
    fn happy_path_records_history() {
        let mut site = site();
        site.assign_plan(plan()).unwrap();
        site.mark_provisioned(Uuid::nil()).unwrap();
        site.mark_hardware_bound().unwrap();
        site.activate().unwrap();

        assert!(site.state().is_active());
        let stages: Vec<_> = site.history().iter().map(|t| t.to).collect();
        assert_eq!(
            stages,
            [
                SiteStage::AddressPlanned,
                SiteStage::Provisioned,
                SiteStage::HardwareBound,
                SiteStage::Active
            ]
        );
    }

    #[test]
    fn stages_cannot_be_skipped() {
        let mut site = site();
        let err = site.mark_provisioned(Uuid::nil()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(site.state(), &SiteState::Requested);
        assert!(site.history().is_empty());
    }

    #[test]
    fn plan_is_assigned_once() {
        let mut site = site();
        site.assign_plan(plan()).unwrap();
        assert!(site.assign_plan(plan()).is_err());
    }

    #[test]
    fn failure_records_attempted_stage() {
        let mut site = site();
        site.assign_plan(plan()).unwrap();
        site.fail(FailureCause::Remote(RemoteFailure::rejection("bad name")))
            .unwrap();

        assert_eq!(site.state().stage(), SiteStage::Provisioned);
        assert!(site.state().is_failed());
        assert_eq!(site.state().to_string(), "failed (provisioned)");
        assert!(!site.history().last().unwrap().succeeded);
        assert!(site.plan().is_some());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut site = site();
        site.fail(FailureCause::Remote(RemoteFailure::transport("timeout")))
            .unwrap();
        assert!(site.fail(FailureCause::Remote(RemoteFailure::transport("again"))).is_err());
        assert!(site.assign_plan(plan()).is_err());
    }
}
